#![forbid(unsafe_code)]

//! Registry tuning.
//!
//! The defaults are right for nearly every program. Two knobs exist:
//!
//! - `reap_expired`: reclaim slots held by expired weak wrappers before
//!   growing a full listener array (`FXPROP_REAP_EXPIRED`).
//! - `initial_capacity`: backing capacity of a freshly created listener
//!   array (`FXPROP_INITIAL_CAPACITY`).
//!
//! [`RegistryConfig::global`] reads the environment once and caches the
//! result for the lifetime of the process.

use std::sync::OnceLock;

/// Configuration for listener registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Compact expired weak listeners out of a full array before growing it.
    pub reap_expired: bool,
    /// Capacity of a newly allocated listener array (at least 1).
    pub initial_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reap_expired: true,
            initial_capacity: 1,
        }
    }
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl RegistryConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether expired weak listeners are reclaimed on add.
    #[must_use]
    pub fn with_reap_expired(mut self, enabled: bool) -> Self {
        self.reap_expired = enabled;
        self
    }

    /// Set the initial array capacity. Zero is clamped to one.
    #[must_use]
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity.max(1);
        self
    }

    /// Build a configuration using a custom environment lookup.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = get_env("FXPROP_REAP_EXPIRED") {
            config.reap_expired = env_flag(&value);
        }
        if let Some(capacity) = get_env("FXPROP_INITIAL_CAPACITY")
            .and_then(|value| value.trim().parse::<usize>().ok())
        {
            config = config.with_initial_capacity(capacity);
        }
        config
    }

    /// Process-wide configuration, read from the environment on first use.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<RegistryConfig> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::from_env_with(|key| std::env::var(key).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = RegistryConfig::default();
        assert!(config.reap_expired);
        assert_eq!(config.initial_capacity, 1);
    }

    #[test]
    fn env_disables_reaping() {
        let config = RegistryConfig::from_env_with(lookup(&[("FXPROP_REAP_EXPIRED", "off")]));
        assert!(!config.reap_expired);
        let config = RegistryConfig::from_env_with(lookup(&[("FXPROP_REAP_EXPIRED", " YES ")]));
        assert!(config.reap_expired);
    }

    #[test]
    fn env_capacity_parsed_and_clamped() {
        let config = RegistryConfig::from_env_with(lookup(&[("FXPROP_INITIAL_CAPACITY", "8")]));
        assert_eq!(config.initial_capacity, 8);
        let config = RegistryConfig::from_env_with(lookup(&[("FXPROP_INITIAL_CAPACITY", "0")]));
        assert_eq!(config.initial_capacity, 1);
        let config = RegistryConfig::from_env_with(lookup(&[("FXPROP_INITIAL_CAPACITY", "lots")]));
        assert_eq!(config.initial_capacity, 1);
    }

    #[test]
    fn builder_chains() {
        let config = RegistryConfig::new()
            .with_reap_expired(false)
            .with_initial_capacity(4);
        assert!(!config.reap_expired);
        assert_eq!(config.initial_capacity, 4);
    }
}
