mod add_messages;
mod map_merge;
mod reducer_registry;

pub use add_messages::AddMessages;
pub use map_merge::MapMerge;
pub use reducer_registry::*;

use crate::node::NodePartial;
use crate::state::ThreadState;
use crate::types::ChannelType;
use std::fmt;

/// Unified reducer trait: every reducer mutates ThreadState using a
/// NodePartial delta and bumps the channel version when the merge actually
/// changed channel contents.
///
/// Channels currently implemented: messages (append-unique by message id)
/// and extra (shallow JSON map merge, last-writer-wins per key).
pub trait Reducer: Send + Sync {
    fn apply(&self, state: &mut ThreadState, update: &NodePartial);
}

#[derive(Debug)]
pub enum ReducerError {
    UnknownChannel(ChannelType),

    Apply {
        channel: ChannelType,
        message: String,
    },
}

impl fmt::Display for ReducerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReducerError::UnknownChannel(channel) => {
                write!(f, "no reducers registered for channel: {channel:?}")
            }
            ReducerError::Apply { channel, message } => {
                write!(f, "reducer apply failed for channel {channel:?}: {message}")
            }
        }
    }
}

impl std::error::Error for ReducerError {}
