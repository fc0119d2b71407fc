use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;

use crate::interrupts::InterruptRequest;
use crate::message::Message;

/// An observable unit of execution progress.
///
/// Serializable so hosts can forward events over the wire (e.g. as
/// server-sent events) without re-shaping them.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A node is about to execute.
    NodeStart { node: String, step: u64 },
    /// A node completed and its delta was committed.
    NodeEnd { node: String, step: u64 },
    /// The state change committed by one super-step.
    ///
    /// `messages` holds only what the merge actually appended; subscribers
    /// additionally filter ids they have already seen.
    StateDelta {
        node: String,
        step: u64,
        messages: Vec<Message>,
        extra: FxHashMap<String, Value>,
    },
    /// The thread suspended awaiting external input.
    Interrupt { request: InterruptRequest },
    /// The thread's run reached `End`.
    Done { step: u64 },
    /// A super-step failed; the thread's last checkpoint is intact.
    Error { message: String, step: u64 },
}

impl StreamEvent {
    /// The node a scoped event belongs to, if any.
    #[must_use]
    pub fn node(&self) -> Option<&str> {
        match self {
            StreamEvent::NodeStart { node, .. }
            | StreamEvent::NodeEnd { node, .. }
            | StreamEvent::StateDelta { node, .. } => Some(node),
            _ => None,
        }
    }
}

impl fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamEvent::NodeStart { node, step } => write!(f, "[{step}] start {node}"),
            StreamEvent::NodeEnd { node, step } => write!(f, "[{step}] end {node}"),
            StreamEvent::StateDelta {
                node,
                step,
                messages,
                extra,
            } => write!(
                f,
                "[{step}] delta from {node}: {} message(s), {} extra key(s)",
                messages.len(),
                extra.len()
            ),
            StreamEvent::Interrupt { request } => {
                write!(f, "interrupt ({}): {}", request.kind, request.title)
            }
            StreamEvent::Done { step } => write!(f, "[{step}] done"),
            StreamEvent::Error { message, step } => write!(f, "[{step}] error: {message}"),
        }
    }
}
