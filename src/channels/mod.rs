//! Versioned state channels.
//!
//! A channel pairs a piece of thread state with a monotonically increasing
//! version counter. Reducers bump the version whenever a merge actually
//! changes channel contents, so observers can detect change cheaply by
//! comparing versions instead of diffing data.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;

/// Common interface over a versioned state channel.
///
/// Exposes the payload for reads and mutation plus the version counter.
/// Mutating through [`get_mut`](Channel::get_mut) does NOT bump the version;
/// version bumps are the reducers' responsibility so that a bump always means
/// "a merge changed this channel".
pub trait Channel {
    /// The payload type stored in this channel.
    type Payload;

    /// Immutable access to the payload.
    fn get(&self) -> &Self::Payload;

    /// Mutable access to the payload. Does not touch the version.
    fn get_mut(&mut self) -> &mut Self::Payload;

    /// Current version of this channel.
    fn version(&self) -> u32;

    /// Sets the version counter.
    fn set_version(&mut self, version: u32);

    /// Increments the version counter by one.
    fn bump_version(&mut self) {
        self.set_version(self.version() + 1);
    }

    /// Cloned copy of the payload.
    fn snapshot(&self) -> Self::Payload
    where
        Self::Payload: Clone,
    {
        self.get().clone()
    }
}

/// Versioned channel holding the thread's conversation messages.
///
/// Merge semantics are append-unique by message id: a message whose id is
/// already present is skipped, everything else is appended in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesChannel {
    items: Vec<Message>,
    version: u32,
}

impl MessagesChannel {
    /// Creates a messages channel with the given contents and version.
    #[must_use]
    pub fn new(items: Vec<Message>, version: u32) -> Self {
        Self { items, version }
    }

    /// Number of messages currently in the channel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the channel holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for MessagesChannel {
    fn default() -> Self {
        Self::new(Vec::new(), 1)
    }
}

impl Channel for MessagesChannel {
    type Payload = Vec<Message>;

    fn get(&self) -> &Vec<Message> {
        &self.items
    }

    fn get_mut(&mut self) -> &mut Vec<Message> {
        &mut self.items
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }
}

/// Versioned channel holding custom key-value metadata.
///
/// Merge semantics are last-writer-wins per key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrasChannel {
    map: FxHashMap<String, Value>,
    version: u32,
}

impl ExtrasChannel {
    /// Creates an extras channel with the given contents and version.
    #[must_use]
    pub fn new(map: FxHashMap<String, Value>, version: u32) -> Self {
        Self { map, version }
    }
}

impl Default for ExtrasChannel {
    fn default() -> Self {
        Self::new(FxHashMap::default(), 1)
    }
}

impl Channel for ExtrasChannel {
    type Payload = FxHashMap<String, Value>;

    fn get(&self) -> &FxHashMap<String, Value> {
        &self.map
    }

    fn get_mut(&mut self) -> &mut FxHashMap<String, Value> {
        &mut self.map
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_start_at_version_one() {
        assert_eq!(MessagesChannel::default().version(), 1);
        assert_eq!(ExtrasChannel::default().version(), 1);
    }

    #[test]
    fn test_get_mut_does_not_bump_version() {
        let mut ch = MessagesChannel::default();
        ch.get_mut().push(Message::user("hi"));
        assert_eq!(ch.version(), 1);
        ch.bump_version();
        assert_eq!(ch.version(), 2);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut ch = ExtrasChannel::default();
        ch.get_mut().insert("k".into(), json!(42));
        ch.set_version(3);
        let json = serde_json::to_string(&ch).unwrap();
        let back: ExtrasChannel = serde_json::from_str(&json).unwrap();
        assert_eq!(ch, back);
    }
}
