#![allow(dead_code)]

pub mod nodes;

pub use nodes::*;

use stepflow::state::{StateSnapshot, ThreadState};

pub fn empty_snapshot() -> StateSnapshot {
    ThreadState::builder().build().snapshot()
}

/// Collects (role, content) pairs for easy assertions on conversations.
pub fn transcript(snapshot: &StateSnapshot) -> Vec<(String, String)> {
    snapshot
        .messages
        .iter()
        .map(|m| (m.role.clone(), m.content.clone()))
        .collect()
}
