//! Keyed configuration lookup.
//!
//! Property parsing and caching belong to the embedding harness. This crate
//! only consumes the [`ConfigStore`] contract: named groups ("aliases") of
//! string keys, safe to read from many workers at once.

use hashbrown::HashMap;

use crate::error::ConfigError;

/// Read-only, cached configuration groups.
pub trait ConfigStore: Send + Sync {
    /// Look up `key` in the group named `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAlias`] when the group does not exist. A
    /// missing key inside a known group is `Ok(None)`.
    fn get(&self, alias: &str, key: &str) -> Result<Option<String>, ConfigError>;
}

/// In-memory [`ConfigStore`], immutable once built.
///
/// Alias names are matched case-insensitively; keys are matched exactly and
/// values are trimmed on insertion.
///
/// # Examples
///
/// ```
/// use unitscope::config::{ConfigStore, MemoryConfigStore};
///
/// let store = MemoryConfigStore::new().with("global", "viewport", " 1280x720 ");
/// assert_eq!(store.get("Global", "viewport").unwrap().as_deref(), Some("1280x720"));
/// assert_eq!(store.get("global", "missing").unwrap(), None);
/// assert!(store.get("object", "anything").is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryConfigStore {
    groups: HashMap<String, HashMap<String, String>>,
}

impl MemoryConfigStore {
    /// Construct a store with no groups.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an empty group so lookups in it succeed with `None`.
    #[must_use]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.groups.entry(alias.to_lowercase()).or_default();
        self
    }

    /// Add `key = value` to the group named `alias`, creating the group.
    #[must_use]
    pub fn with(mut self, alias: &str, key: impl Into<String>, value: &str) -> Self {
        self.groups
            .entry(alias.to_lowercase())
            .or_default()
            .insert(key.into(), value.trim().to_owned());
        self
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, alias: &str, key: &str) -> Result<Option<String>, ConfigError> {
        let group = self
            .groups
            .get(&alias.trim().to_lowercase())
            .ok_or_else(|| ConfigError::UnknownAlias(alias.to_owned()))?;
        Ok(group.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn unknown_alias_is_an_error() {
        let store = MemoryConfigStore::new();
        let Err(error) = store.get("global", "key") else {
            panic!("unknown alias should fail");
        };
        assert!(matches!(error, ConfigError::UnknownAlias(alias) if alias == "global"));
    }

    #[test]
    fn declared_alias_without_keys_yields_none() {
        let store = MemoryConfigStore::new().with_alias("object");
        assert!(matches!(store.get("object", "loginButton"), Ok(None)));
    }

    #[test]
    fn later_values_replace_earlier_ones() {
        let store = MemoryConfigStore::new()
            .with("global", "reportFormat", "json")
            .with("global", "reportFormat", "junit");
        assert!(matches!(
            store.get("global", "reportFormat"),
            Ok(Some(value)) if value == "junit"
        ));
    }

    #[test]
    fn concurrent_reads_see_the_same_values() {
        let store = Arc::new(MemoryConfigStore::new().with("global", "viewport", "800x600"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.get("global", "viewport").ok().flatten())
            })
            .collect();
        for handle in handles {
            assert!(matches!(handle.join(), Ok(Some(value)) if value == "800x600"));
        }
    }
}
