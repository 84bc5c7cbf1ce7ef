//! Shared E2E test helpers for `blockvm` binary tests.

#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use std::path::Path;
use std::time::Duration;

/// Default timeout for one worker run.
pub const TIMEOUT_BASIC: Duration = Duration::from_secs(10);

/// Sentinel prefix used when no configuration overrides it.
pub const PREFIX: &str = "BLOCKVM_INTERPRETER";

/// Variables that would leak the developer's configuration into a test.
const BLOCKVM_VARS: &[&str] = &[
    "BLOCKVM_PROTOCOL_PREFIX",
    "BLOCKVM_RUNTIME_HOME",
    "BLOCKVM_LOG_LEVEL",
    "BLOCKVM_LOG_FILE",
    "BLOCKVM_LOG",
];

/// Build a Command for the `blockvm` binary isolated in `root`.
///
/// `HOME` points at `root` so no global config is picked up, and `root`
/// is used as the project directory.
pub fn blockvm_cmd(root: &Path) -> assert_cmd::Command {
    let mut cmd: assert_cmd::Command = cargo_bin_cmd!("blockvm");
    cmd.timeout(TIMEOUT_BASIC);
    for var in BLOCKVM_VARS {
        cmd.env_remove(var);
    }
    cmd.env("HOME", root);
    cmd.current_dir(root);
    cmd
}

/// Sentinel line `<PREFIX>_<name>` followed by a newline.
pub fn sentinel(name: &str) -> String {
    format!("{PREFIX}_{name}\n")
}

/// One block: filename, code, end-of-block.
pub fn block(filename: &str, code: &str) -> String {
    format!("{filename}\n{code}\n{}", sentinel("END_OF_BLOCK"))
}
