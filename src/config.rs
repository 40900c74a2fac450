//! Configuration for script bridges.
//!
//! A single [`BridgeConfig`] is shared by every bridge of a
//! [`crate::bridge::ScriptSession`].

/// Configuration for script bridges.
///
/// Controls lift caching and how chatty the bridges are towards the log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Reuse lifted IR and syntax trees per `class.method.desc` key (default: true).
    ///
    /// When disabled every apply lifts the method afresh, so mutations from a
    /// previous apply are not visible to the next one.
    pub cache_lifted_methods: bool,

    /// Emit one event per accepted mutation in addition to the per-apply
    /// summary line (default: true).
    pub record_mutations: bool,

    /// Emit a line for every registered handler or rule (default: true).
    pub log_registrations: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            cache_lifted_methods: true,
            record_mutations: true,
            log_registrations: true,
        }
    }
}

impl BridgeConfig {
    /// Creates a configuration that only reports summaries and failures.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            record_mutations: false,
            log_registrations: false,
            ..Self::default()
        }
    }

    /// Creates a configuration that never caches lifted methods.
    #[must_use]
    pub fn uncached() -> Self {
        Self {
            cache_lifted_methods: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let default = BridgeConfig::default();
        assert!(default.cache_lifted_methods);
        assert!(default.record_mutations);

        let quiet = BridgeConfig::quiet();
        assert!(quiet.cache_lifted_methods);
        assert!(!quiet.record_mutations);
        assert!(!quiet.log_registrations);

        assert!(!BridgeConfig::uncached().cache_lifted_methods);
    }
}
