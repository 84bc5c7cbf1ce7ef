//! Lua execution engine for blockvm.
//!
//! Implements the [`blockvm_runtime::ScriptEngine`] capability on top of
//! `mlua` with a vendored Lua 5.4.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  LuaEngine  (one per worker)                         │
//! │    home: Option<PathBuf>, output: OutputSink         │
//! │                     │ create_context()               │
//! │                     ▼                                │
//! │  LuaContext (one per session)                        │
//! │    lua: Lua      ← fresh state, safe stdlib only     │
//! │    handler       ← Rust xpcall message handler       │
//! │    print         → OutputSink (flushed per call)     │
//! │    package.path  → <home>/?.lua;<home>/?/init.lua    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! A block compiles to a main chunk named `@<filename>` whose `_ENV` is
//! the session namespace (the state's globals). It runs under `xpcall`
//! with a Rust message handler that walks the stack with
//! `Lua::inspect_stack`, so reports carry `filename:line` frames,
//! outermost first.
//!
//! # Example
//!
//! ```
//! use blockvm_lua::{testing::SharedBuffer, LuaEngine};
//! use blockvm_runtime::{execute, ExecutionContext, ScriptEngine};
//!
//! let out = SharedBuffer::new();
//! let mut engine = LuaEngine::new().with_output(out.clone());
//! let ctx = engine.create_context().unwrap();
//! let ns = ctx.namespace();
//!
//! assert!(execute(&ctx, "print('hi', 1 + 1)\n", "m.lua", &ns).is_success());
//! assert_eq!(out.contents(), "hi\t2\n");
//! ```

mod context;
mod engine;
mod error;
mod fault;
pub mod home;
pub mod testing;

pub use context::{LuaContext, LuaUnit};
pub use engine::{LuaEngine, OutputSink};
pub use error::LuaEngineError;
pub use fault::LuaFault;
pub use home::{HomeDiscovery, HomeError, HomeStrategy};
