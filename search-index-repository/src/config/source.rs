//! Key-value configuration sources.
//!
//! The facade never reads configuration itself; it is handed a `ConfigSource`
//! and resolves an `IndexConfig` from it exactly once.

use std::collections::{BTreeMap, HashMap};
use std::env;

/// A read-only key-value configuration source.
///
/// Blank values are treated the same as missing keys.
pub trait ConfigSource {
    /// Raw value for `key`, if present.
    fn get(&self, key: &str) -> Option<String>;

    /// Value for `key`, trimmed, with blank values mapped to `None`.
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

/// Default prefix for environment-backed configuration.
pub const DEFAULT_ENV_PREFIX: &str = "SEARCH_";

/// Configuration read from environment variables.
///
/// A key such as `solr_host` is looked up as `{prefix}SOLR_HOST`.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_ENV_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable name for a configuration key.
    pub fn variable_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_uppercase())
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(self.variable_name(key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_missing() {
        let mut source = HashMap::new();
        source.insert("engine".to_string(), "  ".to_string());
        source.insert("solr_core".to_string(), " hub ".to_string());

        assert_eq!(source.get_non_empty("engine"), None);
        assert_eq!(source.get_non_empty("solr_core"), Some("hub".to_string()));
        assert_eq!(source.get_non_empty("missing"), None);
    }

    #[test]
    fn test_env_variable_name() {
        assert_eq!(EnvSource::new().variable_name("solr_host"), "SEARCH_SOLR_HOST");
        assert_eq!(
            EnvSource::with_prefix("HUB_").variable_name("engine"),
            "HUB_ENGINE"
        );
    }

    #[test]
    fn test_env_source_reads_prefixed_variables() {
        let source = EnvSource::with_prefix("SEARCH_INDEX_SOURCE_TEST_");
        env::set_var("SEARCH_INDEX_SOURCE_TEST_ENGINE", "memory");

        assert_eq!(source.get("engine"), Some("memory".to_string()));
        assert_eq!(source.get("solr_host"), None);

        env::remove_var("SEARCH_INDEX_SOURCE_TEST_ENGINE");
    }
}
