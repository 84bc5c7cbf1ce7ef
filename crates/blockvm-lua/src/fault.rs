//! Lua faults.

use blockvm_runtime::Fault;
use blockvm_types::Frame;
use mlua::{DebugSource, Function, Lua, Value};

/// Start of the traceback mlua appends to wrapped callback errors.
const TRACEBACK_MARKER: &str = "\nstack traceback:";

/// A failure raised by compiling or running a Lua block.
///
/// The raised value is rendered while the state is still live, so the
/// fault owns plain data and outlives nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuaFault {
    rendered: Result<String, String>,
    frames: Vec<Frame>,
}

impl LuaFault {
    /// Fault with a message and no traceback.
    pub(crate) fn message(message: impl Into<String>) -> Self {
        Self {
            rendered: Ok(message.into()),
            frames: Vec::new(),
        }
    }

    /// Converts an mlua error raised outside the message handler.
    ///
    /// Syntax errors already carry `filename:line:` in their message.
    pub(crate) fn from_error(err: &mlua::Error) -> Self {
        Self::message(describe(err))
    }

    /// Captures a raised value from inside the message handler, while the
    /// failing frames are still on the stack.
    ///
    /// `tostring` is the state's original `tostring`, so scripts that
    /// replace the global cannot change how their errors are reported.
    pub(crate) fn capture(lua: &Lua, tostring: &Function, value: Value) -> Self {
        Self {
            rendered: render(tostring, value),
            frames: stack_frames(lua),
        }
    }
}

impl Fault for LuaFault {
    fn render(&self) -> Result<String, String> {
        self.rendered.clone()
    }

    fn traceback(&self) -> Vec<Frame> {
        self.frames.clone()
    }
}

fn render(tostring: &Function, value: Value) -> Result<String, String> {
    match value {
        // Raised by a Rust callback such as `print`.
        Value::Error(err) => Ok(describe(&err)),
        other => tostring
            .call::<mlua::String>(other)
            .map(|text| text.to_string_lossy().to_string())
            .map_err(|e| describe(&e)),
    }
}

/// Lua frames on the current stack, outermost first.
///
/// C functions (the handler itself, `xpcall`, `print`) and frames without
/// a current line are skipped.
fn stack_frames(lua: &Lua) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut level = 0;
    while let Some(debug) = lua.inspect_stack(level) {
        level += 1;
        let source = debug.source();
        if source.what == "C" {
            continue;
        }
        let Ok(line) = u32::try_from(debug.curr_line()) else {
            continue;
        };
        if line == 0 {
            continue;
        }
        frames.push(Frame::new(source_name(&source), line));
    }
    frames.reverse();
    frames
}

/// Chunk name as given at compile time, without Lua's `@` marker.
///
/// `short_src` truncates long paths, so it is only a fallback for chunks
/// that were not loaded from a named block.
fn source_name(source: &DebugSource<'_>) -> String {
    match source.source.as_deref().and_then(|name| name.strip_prefix('@')) {
        Some(name) => name.to_string(),
        None => source.short_src.as_deref().unwrap_or("?").to_string(),
    }
}

/// Root-cause message of an mlua error, on one line's worth of text.
fn describe(err: &mlua::Error) -> String {
    let message = match err {
        mlua::Error::SyntaxError { message, .. } => message.clone(),
        mlua::Error::RuntimeError(msg) => msg.clone(),
        mlua::Error::CallbackError { cause, .. } => return describe(cause),
        _ => err.to_string(),
    };
    match message.find(TRACEBACK_MARKER) {
        Some(end) => message[..end].to_string(),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn describe_unwraps_callback_errors() {
        let inner = mlua::Error::RuntimeError("inner".into());
        let err = mlua::Error::CallbackError {
            traceback: "stack traceback:\n\t[C]: in ?".into(),
            cause: Arc::new(inner),
        };
        assert_eq!(LuaFault::from_error(&err).render(), Ok("inner".to_string()));
    }

    #[test]
    fn describe_unwraps_nested_callback_errors() {
        let err = mlua::Error::CallbackError {
            traceback: String::new(),
            cause: Arc::new(mlua::Error::CallbackError {
                traceback: String::new(),
                cause: Arc::new(mlua::Error::RuntimeError("m.lua:1: nope".into())),
            }),
        };
        assert_eq!(describe(&err), "m.lua:1: nope");
    }

    #[test]
    fn describe_drops_appended_traceback() {
        let err = mlua::Error::RuntimeError(
            "m.lua:3: bad\nstack traceback:\n\t[C]: in function 'error'\n\tm.lua:3: in main chunk"
                .into(),
        );
        assert_eq!(describe(&err), "m.lua:3: bad");
    }

    #[test]
    fn render_uses_the_given_tostring() {
        let lua = Lua::new();
        let tostring: Function = lua.globals().get("tostring").unwrap();
        assert_eq!(render(&tostring, Value::Integer(42)), Ok("42".to_string()));
        assert_eq!(render(&tostring, Value::Nil), Ok("nil".to_string()));

        let wrapped = Value::Error(Box::new(mlua::Error::RuntimeError("boom".into())));
        assert_eq!(render(&tostring, wrapped), Ok("boom".to_string()));
    }

    #[test]
    fn render_failure_is_reported_as_error() {
        let lua = Lua::new();
        let tostring: Function = lua.globals().get("tostring").unwrap();
        let value: Value = lua
            .load("return setmetatable({}, { __tostring = function() error('nope') end })")
            .eval()
            .unwrap();
        assert!(render(&tostring, value).is_err());
    }
}
