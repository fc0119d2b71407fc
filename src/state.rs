//! Per-thread state management.
//!
//! This module provides the versioned state record that a workflow thread
//! executes against. State is organized into versioned channels that support
//! snapshotting, deep cloning, and serde persistence.
//!
//! # Core Types
//!
//! - [`ThreadState`]: The mutable per-thread state container
//! - [`StateSnapshot`]: Immutable read view handed to nodes and routers
//!
//! # Channels
//!
//! - **Messages**: the conversation, merged append-unique by message id
//! - **Extra**: string-keyed JSON metadata, merged last-writer-wins per key
//!
//! # Examples
//!
//! ```rust
//! use stepflow::state::ThreadState;
//! use stepflow::channels::Channel;
//! use serde_json::json;
//!
//! let mut state = ThreadState::new_with_user_message("Hello, world!");
//! state.extra.get_mut().insert("customer_id".to_string(), json!("cust-1"));
//!
//! let snapshot = state.snapshot();
//! assert_eq!(snapshot.messages.len(), 1);
//! assert_eq!(snapshot.extra.get("customer_id"), Some(&json!("cust-1")));
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    channels::{Channel, ExtrasChannel, MessagesChannel},
    message::Message,
};

/// The mutable state record of one workflow thread.
///
/// `ThreadState` manages two independent channels of versioned data:
/// conversation messages and custom extras. Each channel maintains its own
/// version counter, bumped by the reducers whenever a merge changes its
/// contents.
///
/// The whole record derives serde so checkpoints can store it as JSON.
///
/// # Examples
///
/// ```rust
/// use stepflow::state::ThreadState;
/// use stepflow::message::Message;
/// use stepflow::channels::Channel;
/// use serde_json::json;
///
/// let mut state = ThreadState::new_with_user_message("Process this");
/// state.extra.get_mut().insert("priority".to_string(), json!("high"));
/// state.messages.get_mut().push(Message::assistant("Working on it."));
///
/// let snapshot = state.snapshot();
/// assert_eq!(snapshot.messages.len(), 2);
/// assert_eq!(snapshot.extra.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThreadState {
    /// Message channel containing the conversation.
    pub messages: MessagesChannel,
    /// Extra channel for custom metadata and intermediate results.
    pub extra: ExtrasChannel,
}

/// Immutable snapshot of thread state at a specific point in time.
///
/// `StateSnapshot` is the read-only view nodes and conditional routers
/// receive during execution. It contains cloned data from both channels
/// along with their version numbers; mutating the underlying state after
/// the snapshot was taken does not affect it.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    /// Messages at the time of snapshot.
    pub messages: Vec<Message>,
    /// Version of the messages channel when the snapshot was taken.
    pub messages_version: u32,
    /// Extra data at the time of snapshot.
    pub extra: FxHashMap<String, Value>,
    /// Version of the extra channel when the snapshot was taken.
    pub extra_version: u32,
}

impl StateSnapshot {
    /// The newest message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The newest message with the given role, if any.
    #[must_use]
    pub fn last_message_with_role(&self, role: &str) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.has_role(role))
    }
}

impl ThreadState {
    /// Creates a new thread state initialized with a single user message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stepflow::state::ThreadState;
    ///
    /// let state = ThreadState::new_with_user_message("Analyze this");
    /// let snapshot = state.snapshot();
    ///
    /// assert_eq!(snapshot.messages.len(), 1);
    /// assert_eq!(snapshot.messages[0].role, "user");
    /// assert_eq!(snapshot.messages_version, 1);
    /// assert!(snapshot.extra.is_empty());
    /// ```
    pub fn new_with_user_message(user_text: &str) -> Self {
        Self {
            messages: MessagesChannel::new(vec![Message::user(user_text)], 1),
            extra: ExtrasChannel::default(),
        }
    }

    /// Creates a new thread state initialized with an existing chat history.
    pub fn new_with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: MessagesChannel::new(messages, 1),
            extra: ExtrasChannel::default(),
        }
    }

    /// Creates a builder for constructing state with a fluent API.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stepflow::state::ThreadState;
    /// use serde_json::json;
    ///
    /// let state = ThreadState::builder()
    ///     .with_user_message("Hello, assistant!")
    ///     .with_assistant_message("Hello! How can I help?")
    ///     .with_extra("customer_id", json!("cust-123"))
    ///     .build();
    ///
    /// let snapshot = state.snapshot();
    /// assert_eq!(snapshot.messages.len(), 2);
    /// assert_eq!(snapshot.extra.len(), 1);
    /// ```
    pub fn builder() -> ThreadStateBuilder {
        ThreadStateBuilder::default()
    }

    /// Creates an immutable snapshot of the current state.
    ///
    /// Clones both channels, so this is O(n) in the state size.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            messages: self.messages.snapshot(),
            messages_version: self.messages.version(),
            extra: self.extra.snapshot(),
            extra_version: self.extra.version(),
        }
    }
}

/// Builder for constructing [`ThreadState`] with a fluent API.
///
/// Useful for setting up initial or test states with multiple messages and
/// metadata entries.
#[derive(Debug, Default)]
pub struct ThreadStateBuilder {
    messages: Vec<Message>,
    extra: FxHashMap<String, Value>,
}

impl ThreadStateBuilder {
    /// Adds a user message.
    #[must_use]
    pub fn with_user_message(mut self, content: &str) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Adds an assistant message.
    #[must_use]
    pub fn with_assistant_message(mut self, content: &str) -> Self {
        self.messages.push(Message::assistant(content));
        self
    }

    /// Adds a system message.
    #[must_use]
    pub fn with_system_message(mut self, content: &str) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    /// Adds a pre-built message.
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Adds a metadata entry to the extra channel.
    #[must_use]
    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Builds the final state. All channels start at version 1.
    #[must_use]
    pub fn build(self) -> ThreadState {
        ThreadState {
            messages: MessagesChannel::new(self.messages, 1),
            extra: ExtrasChannel::new(self.extra, 1),
        }
    }
}
