//! Durable checkpoints and the pluggable checkpoint store.
//!
//! A [`Checkpoint`] is the immutable, serde-friendly image of a thread
//! session after a committed super-step (or at suspension). Loading the
//! latest checkpoint for a thread reconstitutes the session exactly, which
//! is what makes interrupts survive a process restart.
//!
//! The store is pluggable through the [`Checkpointer`] trait; the crate
//! ships an [`InMemoryCheckpointer`] for tests and development. All
//! checkpoint contents are plain serde data, so an external backend can
//! persist them as JSON blobs keyed by thread id and step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::interrupts::InterruptRequest;
use crate::runtimes::runtime_config::RunConfig;
use crate::runtimes::session::ThreadSession;
use crate::state::ThreadState;
use crate::types::NodeKind;

/// Immutable snapshot of a thread session at a committed boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The thread this checkpoint belongs to.
    pub thread_id: String,
    /// Number of committed super-steps at checkpoint time.
    pub step: u64,
    /// The thread's state record.
    pub state: ThreadState,
    /// The node the next super-step will execute.
    pub next_node: NodeKind,
    /// The interrupt awaiting a response, if the thread is suspended.
    pub pending_interrupt: Option<InterruptRequest>,
    /// Ordinal-indexed responses recorded for the current node execution.
    #[serde(default)]
    pub interrupt_history: Vec<Value>,
    /// When this checkpoint was written.
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Captures the durable subset of a session.
    #[must_use]
    pub fn from_session(session: &ThreadSession) -> Self {
        Self {
            thread_id: session.thread_id.clone(),
            step: session.step,
            state: session.state.clone(),
            next_node: session.next_node.clone(),
            pending_interrupt: session.pending_interrupt.clone(),
            interrupt_history: session.interrupt_history.clone(),
            created_at: Utc::now(),
        }
    }

    /// Reconstitutes a session, marrying the checkpoint with the
    /// host-supplied configuration.
    #[must_use]
    pub fn into_session(self, config: RunConfig) -> ThreadSession {
        ThreadSession {
            thread_id: self.thread_id,
            config,
            state: self.state,
            next_node: self.next_node,
            pending_interrupt: self.pending_interrupt,
            interrupt_history: self.interrupt_history,
            step: self.step,
        }
    }
}

/// Failures reported by a checkpoint store.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    /// The backing store rejected or failed the operation.
    #[error("checkpoint store failure: {message}")]
    #[diagnostic(
        code(stepflow::checkpointer::backend),
        help("The super-step is not committed; the thread's last checkpoint is intact.")
    )]
    Backend { message: String },

    /// Checkpoint contents could not be serialized or deserialized.
    #[error(transparent)]
    #[diagnostic(code(stepflow::checkpointer::serde))]
    Serde(#[from] serde_json::Error),
}

impl CheckpointerError {
    /// Creates a [`CheckpointerError::Backend`] from any displayable cause.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        CheckpointerError::Backend {
            message: message.into(),
        }
    }
}

/// Pluggable persistence for thread checkpoints.
///
/// Implementations must be safe for concurrent use across distinct thread
/// ids; the engine serializes operations within one thread itself.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Persists a checkpoint.
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError>;

    /// Loads the most recent checkpoint for a thread, if any.
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointerError>;

    /// Lists every thread id with at least one checkpoint.
    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError>;
}

/// Volatile checkpoint store for testing and development.
///
/// Keeps the full step history per thread and returns the newest checkpoint
/// on load.
#[derive(Default)]
pub struct InMemoryCheckpointer {
    inner: RwLock<FxHashMap<String, Vec<Checkpoint>>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        self.inner
            .write()
            .entry(checkpoint.thread_id.clone())
            .or_default()
            .push(checkpoint);
        Ok(())
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        Ok(self
            .inner
            .read()
            .get(thread_id)
            .and_then(|history| history.last().cloned()))
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError> {
        Ok(self.inner.read().keys().cloned().collect())
    }
}
