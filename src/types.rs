//! Core identity types for the stepflow workflow engine.
//!
//! This module defines the fundamental types used throughout the system for
//! identifying nodes and state channels in workflow graphs.
//!
//! # Key Types
//!
//! - [`NodeKind`]: Identifies nodes in a workflow graph
//! - [`ChannelType`]: Identifies the state channels managed by reducers
//!
//! # Examples
//!
//! ```rust
//! use stepflow::types::{NodeKind, ChannelType};
//!
//! let start = NodeKind::Start;
//! let custom = NodeKind::Custom("Router".to_string());
//! let end = NodeKind::End;
//!
//! // Encode for persistence
//! let encoded = custom.encode();
//! assert_eq!(encoded, "Custom:Router");
//!
//! let msg_channel = ChannelType::Messages;
//! println!("Channel: {}", msg_channel);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `NodeKind` serves as the unique identifier for nodes in the workflow
/// execution graph. It provides special handling for the virtual entry and
/// terminal nodes while allowing arbitrary custom node types through the
/// `Custom` variant.
///
/// # Persistence
///
/// `NodeKind` supports serialization for checkpointing through both serde
/// and the [`encode`](Self::encode)/[`decode`](Self::decode) string forms.
///
/// # Examples
///
/// ```rust
/// use stepflow::types::NodeKind;
///
/// let processor = NodeKind::Custom("Verify".to_string());
/// let decoded = NodeKind::decode(&processor.encode());
/// assert_eq!(processor, decoded);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Entry point of workflow execution.
    ///
    /// Start is a virtual node that is never implemented or registered; the
    /// single static edge leaving it names the graph's entry node.
    Start,

    /// Terminal of workflow execution.
    ///
    /// End is a virtual node that is never implemented or registered; routing
    /// to it completes the thread's run.
    End,

    /// Custom node identified by a user-defined string.
    ///
    /// The string should be descriptive and unique within the workflow.
    Custom(String),
}

impl NodeKind {
    /// Encode a NodeKind into its persisted string form.
    ///
    /// - `Start` → `"Start"`
    /// - `End` → `"End"`
    /// - `Custom("X")` → `"Custom:X"`
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeKind::Start => "Start".to_string(),
            NodeKind::End => "End".to_string(),
            NodeKind::Custom(s) => format!("Custom:{s}"),
        }
    }

    /// Decode a persisted string form back into a NodeKind.
    ///
    /// Unrecognized formats fall back to `Custom(s)` for forward
    /// compatibility.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use stepflow::types::NodeKind;
    /// assert_eq!(NodeKind::decode("Start"), NodeKind::Start);
    /// assert_eq!(NodeKind::decode("Custom:Verify"), NodeKind::Custom("Verify".to_string()));
    /// assert_eq!(NodeKind::decode("Unknown"), NodeKind::Custom("Unknown".to_string()));
    /// ```
    pub fn decode(s: &str) -> Self {
        if s == "Start" {
            NodeKind::Start
        } else if s == "End" {
            NodeKind::End
        } else if let Some(rest) = s.strip_prefix("Custom:") {
            NodeKind::Custom(rest.to_string())
        } else {
            NodeKind::Custom(s.to_string())
        }
    }

    /// Returns `true` if this is the [`Start`](Self::Start) node.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` if this is the [`End`](Self::End) node.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns `true` if this is a custom node.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

// Developer experience: allow string literals where a NodeKind is expected.
impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeKind::Start,
            "End" => NodeKind::End,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

/// Identifies a versioned state channel.
///
/// Each channel type has its own reducer and update semantics: messages
/// append-unique by id, extra data merges last-writer-wins per key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    /// Channel for the thread's conversation messages.
    Messages,

    /// Channel for custom metadata and intermediate results.
    ///
    /// A flexible key-value store for data nodes need to share across
    /// super-steps, such as routing hints or accumulated results.
    Extra,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Messages => write!(f, "messages"),
            Self::Extra => write!(f, "extra"),
        }
    }
}
