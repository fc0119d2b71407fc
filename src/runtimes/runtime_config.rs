//! Host-supplied per-thread configuration.
//!
//! A [`RunConfig`] carries trusted values the host injects when a thread is
//! created, such as an authenticated customer id. Nodes and tools read it
//! through their context; nothing in user-controlled message content can set
//! or change it. It is not persisted in checkpoints: after a restart the host
//! re-injects it at thread creation, which keeps credentials and identity
//! claims out of the checkpoint store.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// Trusted configuration for one thread.
#[derive(Clone, Debug, Default)]
pub struct RunConfig {
    /// The thread this configuration belongs to.
    pub thread_id: String,
    /// Host-injected key-value data, readable by nodes and tools.
    pub configurable: FxHashMap<String, Value>,
}

impl RunConfig {
    /// Creates an empty configuration for the given thread.
    #[must_use]
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            configurable: FxHashMap::default(),
        }
    }

    /// Creates a configuration seeded from the process environment.
    ///
    /// Loads `.env` once via dotenvy, then imports every variable with a
    /// `STEPFLOW_CONFIG_` prefix as a lowercased string entry
    /// (`STEPFLOW_CONFIG_REGION=eu` becomes `region = "eu"`).
    #[must_use]
    pub fn from_env(thread_id: impl Into<String>) -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::new(thread_id);
        for (key, value) in std::env::vars() {
            if let Some(name) = key.strip_prefix("STEPFLOW_CONFIG_") {
                config
                    .configurable
                    .insert(name.to_lowercase(), Value::String(value));
            }
        }
        config
    }

    /// Adds a configuration entry (builder style).
    #[must_use]
    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.configurable.insert(key.to_string(), value);
        self
    }

    /// Reads a configuration entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.configurable.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_value_and_get() {
        let config = RunConfig::new("t1").with_value("customer_id", json!("cust-9"));
        assert_eq!(config.thread_id, "t1");
        assert_eq!(config.get("customer_id"), Some(&json!("cust-9")));
        assert_eq!(config.get("missing"), None);
    }
}
