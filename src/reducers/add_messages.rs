use rustc_hash::FxHashSet;

use super::Reducer;
use crate::{channels::Channel, node::NodePartial, state::ThreadState};

/// Appends messages to the conversation, skipping any whose id is already
/// present. A message that re-surfaces when a node re-executes after an
/// interrupt is therefore merged exactly once.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct AddMessages;

impl Reducer for AddMessages {
    fn apply(&self, state: &mut ThreadState, update: &NodePartial) {
        if let Some(messages_update) = &update.messages
            && !messages_update.is_empty()
        {
            let mut seen: FxHashSet<String> = state
                .messages
                .get()
                .iter()
                .map(|m| m.id.clone())
                .collect();
            // insert() also drops duplicate ids within the update itself.
            let fresh: Vec<_> = messages_update
                .iter()
                .filter(|m| seen.insert(m.id.clone()))
                .cloned()
                .collect();
            if !fresh.is_empty() {
                state.messages.get_mut().extend(fresh);
                state.messages.bump_version();
            }
        }
    }
}
