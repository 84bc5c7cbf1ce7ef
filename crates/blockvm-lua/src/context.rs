//! One isolated Lua state.

use crate::engine::OutputSink;
use crate::error::LuaEngineError;
use crate::fault::LuaFault;
use blockvm_runtime::ExecutionContext;
use mlua::{ChunkMode, Function, Lua, LuaOptions, MultiValue, StdLib, Table, Value};
use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// A compiled block: the main chunk of one module.
#[derive(Debug, Clone)]
pub struct LuaUnit {
    function: Function,
}

/// Execution context backed by its own Lua state.
///
/// The state opens the safe standard libraries only; `debug` is not
/// reachable from scripts. Tracebacks are collected by a Rust message
/// handler through [`Lua::inspect_stack`].
pub struct LuaContext {
    lua: Lua,
    xpcall: Function,
    handler: Function,
    pending: Arc<Mutex<Option<LuaFault>>>,
    closed: bool,
}

impl LuaContext {
    pub(crate) fn new(home: Option<&Path>, output: OutputSink) -> Result<Self, LuaEngineError> {
        let lua = Lua::new_with(StdLib::ALL_SAFE, LuaOptions::new())?;

        // Captured before any script runs, so reassigning the globals
        // cannot break printing or reporting.
        let globals = lua.globals();
        let xpcall: Function = globals.get("xpcall")?;
        let tostring: Function = globals.get("tostring")?;

        install_print(&lua, tostring.clone(), output)?;
        configure_package(&lua, home)?;

        let pending = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&pending);
        let handler = lua.create_function(move |lua, value: Value| {
            *slot.lock() = Some(LuaFault::capture(lua, &tostring, value));
            Ok(())
        })?;

        Ok(Self {
            lua,
            xpcall,
            handler,
            pending,
            closed: false,
        })
    }

    /// The underlying state.
    #[must_use]
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Returns `true` once the session that owned this state ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Releases everything the scripts allocated. The state itself is
    /// freed when the context is dropped.
    pub(crate) fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.lua.gc_collect() {
            warn!(error = %e, "garbage collection failed on close");
        }
        debug!(memory = self.lua.used_memory(), "lua state closed");
    }
}

impl fmt::Debug for LuaContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LuaContext")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl ExecutionContext for LuaContext {
    type Unit = LuaUnit;
    type Namespace = Table;
    type Fault = LuaFault;

    fn namespace(&self) -> Table {
        self.lua.globals()
    }

    fn compile(&self, source: &str, filename: &str) -> Result<LuaUnit, LuaFault> {
        self.lua
            .load(source)
            .set_name(format!("@{filename}"))
            .set_mode(ChunkMode::Text)
            .set_environment(self.namespace())
            .into_function()
            .map(|function| LuaUnit { function })
            .map_err(|e| LuaFault::from_error(&e))
    }

    // Units are bound to the globals table, the only namespace this
    // context hands out, when they are compiled.
    fn execute(&self, unit: LuaUnit, _namespace: &Table) -> Result<(), LuaFault> {
        let results: MultiValue = self
            .xpcall
            .call((unit.function, self.handler.clone()))
            .map_err(|e| LuaFault::from_error(&e))?;
        let captured = self.pending.lock().take();

        match results.into_iter().next() {
            Some(Value::Boolean(true)) => Ok(()),
            _ => Err(captured
                .unwrap_or_else(|| LuaFault::message("error in the Lua message handler"))),
        }
    }
}

/// Replaces `print` with one that writes to `output` and flushes.
///
/// Values are converted with the state's original `tostring`, as the
/// standard `print` does.
fn install_print(lua: &Lua, tostring: Function, output: OutputSink) -> mlua::Result<()> {
    let print = lua.create_function(move |_, args: MultiValue| {
        let mut line = Vec::new();
        for (i, value) in args.into_iter().enumerate() {
            if i > 0 {
                line.push(b'\t');
            }
            let text: mlua::String = tostring.call(value)?;
            line.extend_from_slice(&text.as_bytes());
        }
        line.push(b'\n');

        let mut out = output.lock();
        out.write_all(&line)
            .and_then(|()| out.flush())
            .map_err(mlua::Error::external)
    })?;
    lua.globals().set("print", print)
}

/// Points `require` at the runtime home and disables C modules.
fn configure_package(lua: &Lua, home: Option<&Path>) -> mlua::Result<()> {
    let package: Table = lua.globals().get("package")?;
    package.set("cpath", "")?;
    if let Some(home) = home {
        let home = home.display();
        package.set("path", format!("{home}/?.lua;{home}/?/init.lua"))?;
    }
    Ok(())
}
