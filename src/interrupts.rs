//! Mid-node suspension and replay.
//!
//! A node that needs external input calls
//! [`NodeContext::request_input`](crate::node::NodeContext::request_input).
//! If the response is not yet known the node suspends: the engine persists a
//! checkpoint with the pending request and returns control to the host. When
//! the host later supplies a response the node re-executes from the top and
//! every `request_input` call whose answer is already recorded returns it
//! instantly, so execution replays deterministically up to the first
//! unanswered call.
//!
//! Replay bookkeeping is ordinal-based: the Nth `request_input` call within
//! one node execution reads the Nth recorded response. The history is cleared
//! when the node completes, so a later re-entry into the same node (including
//! a goto back to itself) starts with fresh ordinals.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured payload describing what a suspended node is asking for.
///
/// The host surfaces this to the external actor (a human, an approval
/// system) and eventually feeds the answer back through
/// [`Stepper::resume`](crate::runtimes::Stepper::resume) as a raw
/// [`serde_json::Value`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptRequest {
    /// Discriminator for the host UI, e.g. `"confirm"` or `"input"`.
    pub kind: String,
    /// Short human-readable title.
    pub title: String,
    /// Full prompt text shown to the actor.
    pub message: String,
    /// Suggested responses, if the request is a choice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl InterruptRequest {
    /// Creates a request with an explicit kind.
    #[must_use]
    pub fn new(kind: &str, title: &str, message: &str) -> Self {
        Self {
            kind: kind.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            options: Vec::new(),
        }
    }

    /// Creates a yes/no confirmation request.
    #[must_use]
    pub fn confirm(title: &str, message: &str) -> Self {
        let mut req = Self::new("confirm", title, message);
        req.options = vec!["yes".to_string(), "no".to_string()];
        req
    }

    /// Creates a free-form input request.
    #[must_use]
    pub fn input(title: &str, message: &str) -> Self {
        Self::new("input", title, message)
    }

    /// Replaces the suggested responses (builder style).
    #[must_use]
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }
}

/// Ordinal cursor over the recorded responses of one node execution.
///
/// Shared by clone between the engine and the [`NodeContext`]
/// (crate::node::NodeContext) handed to the node, and across a subgraph
/// adapter into nested nodes, so ordinals are global across everything that
/// runs within one parent node execution.
#[derive(Clone, Debug)]
pub struct InterruptCursor {
    history: Arc<Vec<Value>>,
    next: Arc<AtomicUsize>,
}

impl InterruptCursor {
    /// Creates a cursor over the given recorded responses, positioned at the
    /// first one.
    #[must_use]
    pub fn new(history: Vec<Value>) -> Self {
        Self {
            history: Arc::new(history),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Consumes the next ordinal and returns its recorded response, or
    /// `None` if this ordinal has no answer yet (the node must suspend).
    pub fn take(&self) -> Option<Value> {
        let ordinal = self.next.fetch_add(1, Ordering::SeqCst);
        self.history.get(ordinal).cloned()
    }

    /// Current ordinal position (number of `take` calls so far).
    #[must_use]
    pub fn position(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }

    /// Rewinds the cursor to an earlier position.
    ///
    /// Used when a retryable failure re-invokes the node: the fresh attempt
    /// must see the same ordinals again.
    pub fn rewind(&self, position: usize) {
        self.next.store(position, Ordering::SeqCst);
    }

    /// Number of recorded responses available for replay.
    #[must_use]
    pub fn recorded(&self) -> usize {
        self.history.len()
    }
}

impl Default for InterruptCursor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
