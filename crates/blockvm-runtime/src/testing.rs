//! Deterministic test doubles for the engine traits.
//!
//! [`FakeEngine`] interprets a tiny line-oriented statement language so
//! the protocol can be exercised without a real interpreter:
//!
//! | Statement            | Effect                                              |
//! |----------------------|-----------------------------------------------------|
//! | `let NAME = INT`     | binds `NAME`                                        |
//! | `add NAME INT`       | adds to an existing binding, raises if unbound      |
//! | `fail MESSAGE`       | raises `MESSAGE` with one frame at the statement    |
//! | `nested N MESSAGE`   | raises from `N` calls deep (`N + 1` frames)         |
//! | `unprintable`        | raises a value that cannot be rendered              |
//! | blank line           | ignored                                             |
//!
//! Anything else is a compile error reported at `FILE:LINE`.
//!
//! # Example
//!
//! ```
//! use blockvm_runtime::testing::FakeEngine;
//! use blockvm_runtime::{execute, ExecutionContext, ScriptEngine};
//!
//! let mut engine = FakeEngine::new();
//! let ctx = engine.create_context().unwrap();
//! let ns = ctx.namespace();
//!
//! assert!(execute(&ctx, "let x = 1\n", "m.fake", &ns).is_success());
//! assert_eq!(ns.get("x"), Some(1));
//! ```

use crate::engine::{EngineError, ExecutionContext, Fault, ScriptEngine};
use blockvm_types::Frame;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Filename used for frames below the block's top level.
pub const NESTED_FRAME_FILE: &str = "lib.fake";

/// Shared, cloneable namespace of a fake context.
#[derive(Debug, Clone, Default)]
pub struct FakeNamespace(Rc<RefCell<HashMap<String, i64>>>);

impl FakeNamespace {
    /// Reads a binding.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<i64> {
        self.0.borrow().get(name).copied()
    }

    /// Writes a binding.
    pub fn set(&self, name: &str, value: i64) {
        self.0.borrow_mut().insert(name.to_string(), value);
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Returns `true` when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Counters and namespaces observed by a [`FakeEngine`], shared so tests
/// can inspect them after the engine has been moved into a manager.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    inner: Rc<RefCell<StatsInner>>,
}

#[derive(Debug, Default)]
struct StatsInner {
    created: usize,
    destroyed: usize,
    closed_namespaces: Vec<FakeNamespace>,
}

impl EngineStats {
    /// Contexts allocated so far.
    #[must_use]
    pub fn created(&self) -> usize {
        self.inner.borrow().created
    }

    /// Contexts torn down so far.
    #[must_use]
    pub fn destroyed(&self) -> usize {
        self.inner.borrow().destroyed
    }

    /// Namespaces of torn-down contexts, in teardown order.
    #[must_use]
    pub fn closed_namespaces(&self) -> Vec<FakeNamespace> {
        self.inner.borrow().closed_namespaces.clone()
    }
}

/// Fake engine with observable context lifecycle.
#[derive(Debug, Default)]
pub struct FakeEngine {
    stats: EngineStats,
    allocation_budget: Option<usize>,
}

impl FakeEngine {
    /// Creates an engine that always allocates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine that refuses allocation after `n` contexts.
    #[must_use]
    pub fn with_allocation_budget(n: usize) -> Self {
        Self {
            stats: EngineStats::default(),
            allocation_budget: Some(n),
        }
    }

    /// Shared lifecycle counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats.clone()
    }
}

impl ScriptEngine for FakeEngine {
    type Context = FakeContext;

    fn create_context(&mut self) -> Result<FakeContext, EngineError> {
        let mut stats = self.stats.inner.borrow_mut();
        if self.allocation_budget.is_some_and(|budget| stats.created >= budget) {
            return Err(EngineError::ContextAllocation(
                "allocation budget exhausted".into(),
            ));
        }
        stats.created += 1;
        Ok(FakeContext::default())
    }

    fn destroy_context(&mut self, context: &mut FakeContext) {
        let mut stats = self.stats.inner.borrow_mut();
        stats.destroyed += 1;
        stats.closed_namespaces.push(context.namespace.clone());
        context.closed = true;
    }
}

/// One fake isolated context.
#[derive(Debug, Default)]
pub struct FakeContext {
    namespace: FakeNamespace,
    compiles: Cell<usize>,
    executions: Cell<usize>,
    closed: bool,
}

impl FakeContext {
    /// Number of `compile` calls.
    #[must_use]
    pub fn compile_count(&self) -> usize {
        self.compiles.get()
    }

    /// Number of `execute` calls.
    #[must_use]
    pub fn execute_count(&self) -> usize {
        self.executions.get()
    }

    /// Returns `true` once the engine tore this context down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stmt {
    Let(String, i64),
    Add(String, i64),
    Fail(String),
    Nested(u32, String),
    Unprintable,
}

/// A compiled fake unit.
#[derive(Debug, Clone)]
pub struct FakeUnit {
    filename: String,
    statements: Vec<(u32, Stmt)>,
}

impl ExecutionContext for FakeContext {
    type Unit = FakeUnit;
    type Namespace = FakeNamespace;
    type Fault = FakeFault;

    fn namespace(&self) -> FakeNamespace {
        self.namespace.clone()
    }

    fn compile(&self, source: &str, filename: &str) -> Result<FakeUnit, FakeFault> {
        self.compiles.set(self.compiles.get() + 1);
        let mut statements = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let line_no = u32::try_from(index + 1).unwrap_or(u32::MAX);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let stmt = parse_stmt(trimmed).ok_or_else(|| {
                FakeFault::compile(format!(
                    "{filename}:{line_no}: syntax error near '{trimmed}'"
                ))
            })?;
            statements.push((line_no, stmt));
        }
        Ok(FakeUnit {
            filename: filename.to_string(),
            statements,
        })
    }

    fn execute(&self, unit: FakeUnit, namespace: &FakeNamespace) -> Result<(), FakeFault> {
        self.executions.set(self.executions.get() + 1);
        for (line, stmt) in unit.statements {
            let here = Frame::new(unit.filename.clone(), line);
            match stmt {
                Stmt::Let(name, value) => namespace.set(&name, value),
                Stmt::Add(name, delta) => match namespace.get(&name) {
                    Some(value) => namespace.set(&name, value + delta),
                    None => {
                        return Err(FakeFault::runtime(
                            format!("name '{name}' is not defined"),
                            vec![here],
                        ))
                    }
                },
                Stmt::Fail(message) => return Err(FakeFault::runtime(message, vec![here])),
                Stmt::Nested(depth, message) => {
                    let mut frames = vec![here];
                    frames.extend((1..=depth).map(|k| Frame::new(NESTED_FRAME_FILE, k)));
                    return Err(FakeFault::runtime(message, frames));
                }
                Stmt::Unprintable => return Err(FakeFault::unprintable(vec![here])),
            }
        }
        Ok(())
    }
}

fn parse_stmt(line: &str) -> Option<Stmt> {
    let mut words = line.split_whitespace();
    match words.next()? {
        "let" => {
            let name = words.next()?;
            if words.next()? != "=" {
                return None;
            }
            let value = words.next()?.parse().ok()?;
            words.next().is_none().then(|| Stmt::Let(name.to_string(), value))
        }
        "add" => {
            let name = words.next()?;
            let delta = words.next()?.parse().ok()?;
            words.next().is_none().then(|| Stmt::Add(name.to_string(), delta))
        }
        "fail" => Some(Stmt::Fail(words.collect::<Vec<_>>().join(" "))),
        "nested" => {
            let depth = words.next()?.parse().ok()?;
            Some(Stmt::Nested(depth, words.collect::<Vec<_>>().join(" ")))
        }
        "unprintable" => words.next().is_none().then_some(Stmt::Unprintable),
        _ => None,
    }
}

/// Fault raised by a [`FakeContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeFault {
    message: Option<String>,
    frames: Vec<Frame>,
}

impl FakeFault {
    /// Compile fault (no frames).
    #[must_use]
    pub fn compile(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            frames: Vec::new(),
        }
    }

    /// Runtime fault with a traceback.
    #[must_use]
    pub fn runtime(message: impl Into<String>, frames: Vec<Frame>) -> Self {
        Self {
            message: Some(message.into()),
            frames,
        }
    }

    /// Fault whose value refuses to render.
    #[must_use]
    pub fn unprintable(frames: Vec<Frame>) -> Self {
        Self {
            message: None,
            frames,
        }
    }
}

impl Fault for FakeFault {
    fn render(&self) -> Result<String, String> {
        self.message
            .clone()
            .ok_or_else(|| "__str__ raised".to_string())
    }

    fn traceback(&self) -> Vec<Frame> {
        self.frames.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_statements() {
        assert_eq!(parse_stmt("let x = 3"), Some(Stmt::Let("x".into(), 3)));
        assert_eq!(parse_stmt("add x -1"), Some(Stmt::Add("x".into(), -1)));
        assert_eq!(parse_stmt("fail a b"), Some(Stmt::Fail("a b".into())));
        assert_eq!(parse_stmt("nested 2 m"), Some(Stmt::Nested(2, "m".into())));
        assert_eq!(parse_stmt("unprintable"), Some(Stmt::Unprintable));
        assert_eq!(parse_stmt("let x 3"), None);
        assert_eq!(parse_stmt("x = 1"), None);
    }

    #[test]
    fn allocation_budget() {
        let mut engine = FakeEngine::with_allocation_budget(1);
        assert!(engine.create_context().is_ok());
        assert!(matches!(
            engine.create_context(),
            Err(EngineError::ContextAllocation(_))
        ));
        assert_eq!(engine.stats().created(), 1);
    }

    #[test]
    fn destroy_records_namespace() {
        let mut engine = FakeEngine::new();
        let mut ctx = engine.create_context().unwrap();
        ctx.namespace().set("k", 9);
        engine.destroy_context(&mut ctx);

        assert!(ctx.is_closed());
        let stats = engine.stats();
        assert_eq!(stats.destroyed(), 1);
        assert_eq!(stats.closed_namespaces()[0].get("k"), Some(9));
    }
}
