//! In-memory execution state of one thread.

use serde_json::Value;

use crate::interrupts::InterruptRequest;
use crate::runtimes::runtime_config::RunConfig;
use crate::state::ThreadState;
use crate::types::NodeKind;

/// Everything the stepper tracks for one thread between super-steps.
///
/// Sessions are created on first use and never auto-deleted; a completed
/// thread accepts further input, which re-enters the graph at its entry
/// node. The durable subset of this struct is what
/// [`Checkpoint`](crate::runtimes::Checkpoint) persists; `config` is
/// deliberately excluded and re-injected by the host after a restart.
#[derive(Clone, Debug)]
pub struct ThreadSession {
    /// The thread this session belongs to.
    pub thread_id: String,
    /// Host-supplied trusted configuration (not persisted).
    pub config: RunConfig,
    /// The thread's current state record.
    pub state: ThreadState,
    /// The node the next super-step will execute.
    pub next_node: NodeKind,
    /// The interrupt currently awaiting a response, if any.
    pub pending_interrupt: Option<InterruptRequest>,
    /// Ordinal-indexed responses recorded for the current node execution.
    ///
    /// Cleared when the node completes; a later re-entry starts with fresh
    /// ordinals.
    pub interrupt_history: Vec<Value>,
    /// Number of committed super-steps.
    pub step: u64,
}

/// Indicates how a thread session was initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadInit {
    /// A brand new thread was created.
    Fresh,
    /// An existing thread was reconstituted from its latest checkpoint.
    Resumed {
        /// The step number of the checkpoint the session was restored from.
        checkpoint_step: u64,
    },
}
