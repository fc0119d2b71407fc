//! Small shared helpers used across the crate.

/// Collection helpers for the extra-data map type used throughout the crate.
pub mod collections {
    use rustc_hash::FxHashMap;
    use serde_json::Value;

    /// Creates an empty extra-data map with the crate's standard hasher.
    ///
    /// # Examples
    /// ```
    /// use stepflow::utils::collections::new_extra_map;
    /// use serde_json::json;
    ///
    /// let mut extra = new_extra_map();
    /// extra.insert("status".to_string(), json!("ok"));
    /// assert_eq!(extra.len(), 1);
    /// ```
    #[must_use]
    pub fn new_extra_map() -> FxHashMap<String, Value> {
        FxHashMap::default()
    }
}

/// Generators for the stable unique ids used by messages, tool calls, and threads.
pub mod ids {
    use uuid::Uuid;

    /// Generates a fresh message id (`msg-<uuid>`).
    #[must_use]
    pub fn new_message_id() -> String {
        format!("msg-{}", Uuid::new_v4())
    }

    /// Generates a fresh tool call id (`tool-<uuid>`).
    #[must_use]
    pub fn new_tool_call_id() -> String {
        format!("tool-{}", Uuid::new_v4())
    }

    /// Generates a fresh thread id (`thread-<uuid>`).
    #[must_use]
    pub fn new_thread_id() -> String {
        format!("thread-{}", Uuid::new_v4())
    }
}
