//! Configuration resolver trait for per-invocation overrides.
//!
//! ```text
//! ConfigLoader.load()  →  WorkerConfig (files + env)
//!                              │
//!                              ▼
//!                     ConfigResolver.apply()     (e.g. CLI flags)
//!                              │
//!                              ▼
//!                     WorkerConfig (final)
//! ```

use super::WorkerConfig;

/// Applies overrides on top of a loaded configuration.
pub trait ConfigResolver {
    /// Applies overrides to the given configuration.
    ///
    /// Only values the resolver actually carries should be applied,
    /// preserving existing values for unspecified options.
    fn apply(&self, config: &mut WorkerConfig);
}

/// Resolver that makes no changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpResolver;

impl ConfigResolver for NoOpResolver {
    fn apply(&self, _config: &mut WorkerConfig) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PrefixOverride(&'static str);

    impl ConfigResolver for PrefixOverride {
        fn apply(&self, config: &mut WorkerConfig) {
            config.protocol.prefix = self.0.to_string();
        }
    }

    #[test]
    fn noop_keeps_config() {
        let mut config = WorkerConfig::default();
        NoOpResolver.apply(&mut config);
        assert_eq!(config, WorkerConfig::default());
    }

    #[test]
    fn custom_resolver_applies() {
        let mut config = WorkerConfig::default();
        PrefixOverride("X").apply(&mut config);
        assert_eq!(config.protocol.prefix, "X");
    }
}
