//! blockvm - block-oriented Lua worker
//!
//! Reads script blocks from stdin and runs each script in a fresh Lua
//! state. Lifecycle events go to stderr, diagnostics and script output
//! to stdout. See `blockvm-runtime` for the wire format.
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`BLOCKVM_*`)
//! 3. File given with `--config`
//! 4. Project config (`.blockvm/config.toml` under the project root)
//! 5. Global config (`~/.blockvm/config.toml`)
//! 6. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `BLOCKVM_PROTOCOL_PREFIX`: Sentinel prefix
//! - `BLOCKVM_RUNTIME_HOME`: Directory searched by `require`
//! - `BLOCKVM_LOG_LEVEL`: Log level used when no flag is given
//! - `BLOCKVM_LOG_FILE`: Append logs to this file instead of stderr
//! - `BLOCKVM_LOG`: Full `EnvFilter` directive (overrides `BLOCKVM_LOG_LEVEL`)
//!
//! # Exit codes
//!
//! - `0`: the worker stopped normally
//! - `1`: bootstrap failed (configuration, runtime home, first session)
//! - `2`: an output channel could not be written

mod tracing_writer;

use anyhow::{Context, Result};
use blockvm_lua::LuaEngine;
use blockvm_runtime::{
    ConfigLoader, ConfigResolver, Emitter, ProtocolError, Worker, WorkerConfig, WorkerSummary,
};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding a full log filter directive.
const LOG_ENV: &str = "BLOCKVM_LOG";

/// Filter used when nothing else selects one.
const DEFAULT_LOG_LEVEL: &str = "warn";

/// blockvm - block-oriented Lua worker
#[derive(Parser, Debug)]
#[command(name = "blockvm")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Additional config file layered above project config
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Project root directory (defaults to current directory)
    #[arg(short = 'C', long)]
    project: Option<PathBuf>,

    /// Sentinel prefix (also: BLOCKVM_PROTOCOL_PREFIX)
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,

    /// Directory searched by `require` (also: BLOCKVM_RUNTIME_HOME)
    #[arg(long, value_name = "DIR")]
    runtime_home: Option<PathBuf>,

    /// Log level or filter directive (also: BLOCKVM_LOG_LEVEL)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Append logs to this file instead of stderr (also: BLOCKVM_LOG_FILE)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Serve a single script, then exit
    #[arg(long)]
    once: bool,
}

/// CLI-based configuration resolver.
///
/// Loads file/env config via [`ConfigLoader`] and applies CLI argument
/// overrides as the highest-priority layer.
struct CliConfigResolver {
    project_root: PathBuf,
    config_file: Option<PathBuf>,
    prefix: Option<String>,
    runtime_home: Option<PathBuf>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
}

impl CliConfigResolver {
    fn from_args(args: &Args) -> Self {
        let project_root = args.project.clone().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|e| {
                eprintln!("Warning: cannot read current directory, using '.': {e}");
                PathBuf::from(".")
            })
        });

        Self {
            project_root,
            config_file: args.config.clone(),
            prefix: args.prefix.clone(),
            runtime_home: args.runtime_home.clone(),
            log_level: args.log_level.clone(),
            log_file: args.log_file.clone(),
        }
    }

    fn loader(&self) -> ConfigLoader {
        let loader = ConfigLoader::new().with_project_root(&self.project_root);
        match self.config_file {
            Some(ref path) => loader.with_config_file(path),
            None => loader,
        }
    }

    /// Loads all layers, applies the CLI layer and validates the result.
    fn resolve(&self) -> Result<WorkerConfig> {
        let mut config = self.loader().load().context("failed to load configuration")?;
        self.apply(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

impl ConfigResolver for CliConfigResolver {
    fn apply(&self, config: &mut WorkerConfig) {
        if let Some(ref prefix) = self.prefix {
            config.protocol.prefix.clone_from(prefix);
        }
        if let Some(ref home) = self.runtime_home {
            config.runtime.home = Some(home.clone());
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = Some(level.clone());
        }
        if let Some(ref file) = self.log_file {
            config.logging.file = Some(file.clone());
        }
    }
}

/// Why the worker stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Bootstrap,
    Output,
}

impl Failure {
    fn of(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ProtocolError>() {
            Some(e) if !e.is_startup_failure() => Self::Output,
            _ => Self::Bootstrap,
        }
    }

    fn exit_code(self) -> ExitCode {
        match self {
            Self::Bootstrap => ExitCode::from(1),
            Self::Output => ExitCode::from(2),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(summary) => {
            debug!(?summary, "exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            Failure::of(&e).exit_code()
        }
    }
}

fn run(args: &Args) -> Result<WorkerSummary> {
    let resolver = CliConfigResolver::from_args(args);
    let config = resolver.resolve()?;

    init_tracing(args, &config);

    info!(
        project = %resolver.project_root.display(),
        prefix = %config.protocol.prefix,
        "starting worker"
    );

    let engine =
        LuaEngine::from_config(&config.runtime).context("failed to set up the Lua runtime")?;

    let emitter = Emitter::new(io::stderr(), io::stdout(), config.sentinels());
    let mut worker = Worker::new(engine, io::stdin().lock(), emitter).once(args.once);

    // Keep ProtocolError as the root cause so the exit code can be derived.
    let summary = worker.run()?;
    Ok(summary)
}

/// Picks the log filter directive.
///
/// `--debug` > `--log-level` > `BLOCKVM_LOG` > config `logging.level` > `warn`.
fn log_filter(args: &Args, config: &WorkerConfig) -> EnvFilter {
    if args.debug {
        return EnvFilter::new("debug");
    }
    if let Some(ref level) = args.log_level {
        return EnvFilter::new(level);
    }
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return filter;
    }
    EnvFilter::new(config.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL))
}

fn init_tracing(args: &Args, config: &WorkerConfig) {
    let filter = log_filter(args, config);

    let log_file = config.logging.resolved_file().and_then(|path| {
        match tracing_writer::open_log_file(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Warning: cannot open log file {}: {e}", path.display());
                None
            }
        }
    });

    if let Some(file) = log_file {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(tracing_writer::FileMakeWriter::new(file));

        tracing_subscriber::registry()
            .with(file_layer.with_filter(filter))
            .init();
    } else {
        let stderr_layer = fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(tracing_writer::StderrMakeWriter);

        tracing_subscriber::registry()
            .with(stderr_layer.with_filter(filter))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockvm_runtime::config::ConfigError;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["blockvm"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    fn isolated(resolver: &CliConfigResolver) -> Result<WorkerConfig, ConfigError> {
        let mut config = resolver
            .loader()
            .skip_global_config()
            .skip_env_vars()
            .load()?;
        resolver.apply(&mut config);
        Ok(config)
    }

    #[test]
    fn parses_all_flags() {
        let a = args(&[
            "-d",
            "--config",
            "/tmp/x.toml",
            "-C",
            "/proj",
            "--prefix",
            "P",
            "--runtime-home",
            "/lua",
            "--log-level",
            "info",
            "--log-file",
            "/tmp/x.log",
            "--once",
        ]);
        assert!(a.debug);
        assert!(a.once);
        assert_eq!(a.project, Some(PathBuf::from("/proj")));
        assert_eq!(a.prefix.as_deref(), Some("P"));
        assert_eq!(a.runtime_home, Some(PathBuf::from("/lua")));
    }

    #[test]
    fn cli_overrides_project_config() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join(".blockvm");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.toml"),
            "[protocol]\nprefix = \"FROM_FILE\"\n[runtime]\nsubdir = \"scripts\"\n",
        )
        .unwrap();

        let project = temp.path().to_string_lossy().into_owned();
        let resolver = CliConfigResolver::from_args(&args(&["-C", &project, "--prefix", "CLI"]));
        let config = isolated(&resolver).unwrap();

        assert_eq!(config.protocol.prefix, "CLI");
        assert_eq!(config.runtime.subdir, "scripts");
    }

    #[test]
    fn unset_flags_keep_loaded_values() {
        let temp = tempfile::TempDir::new().unwrap();
        let project = temp.path().to_string_lossy().into_owned();
        let resolver = CliConfigResolver::from_args(&args(&["-C", &project]));
        let config = isolated(&resolver).unwrap();

        assert_eq!(config, WorkerConfig::default());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let project = temp.path().to_string_lossy().into_owned();
        let missing = temp.path().join("nope.toml").to_string_lossy().into_owned();
        let resolver =
            CliConfigResolver::from_args(&args(&["-C", &project, "--config", &missing]));

        assert!(isolated(&resolver).is_err());
    }

    #[test]
    fn failure_classification() {
        let emit = anyhow::Error::new(ProtocolError::emit(
            "event",
            io::Error::new(io::ErrorKind::BrokenPipe, "closed"),
        ));
        assert_eq!(Failure::of(&emit), Failure::Output);

        let config = anyhow::anyhow!("bad config");
        assert_eq!(Failure::of(&config), Failure::Bootstrap);
    }
}
