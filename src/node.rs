//! Node execution framework.
//!
//! This module provides the core abstractions for executable workflow nodes:
//! the [`Node`] trait, the execution context, partial state updates, and the
//! error signals the engine reacts to.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::control::Route;
use crate::interrupts::{InterruptCursor, InterruptRequest};
use crate::message::Message;
use crate::runtimes::RunConfig;
use crate::state::StateSnapshot;
use crate::types::NodeKind;
use crate::workflow::RouteError;

/// Core trait defining executable workflow nodes.
///
/// A node receives the current state snapshot and execution context, performs
/// its work, and returns a partial state update together with a routing
/// directive. Nodes never mutate state directly; the engine merges their
/// partials through the reducer registry.
///
/// # Suspension
///
/// A node that needs external input calls
/// [`NodeContext::request_input`] and propagates the result with `?`. When no
/// response is recorded yet this returns [`NodeError::Suspended`], the engine
/// checkpoints the pending request, and the node re-executes from the top
/// once the host supplies an answer. Side effects performed before a
/// `request_input` call therefore replay on resume; guard them behind the
/// same call when that matters.
///
/// # Examples
///
/// ```rust,no_run
/// use stepflow::control::Route;
/// use stepflow::message::Message;
/// use stepflow::node::{Node, NodeContext, NodeError, NodeOutput, NodePartial};
/// use stepflow::state::StateSnapshot;
/// use async_trait::async_trait;
///
/// struct GreetingNode;
///
/// #[async_trait]
/// impl Node for GreetingNode {
///     async fn run(
///         &self,
///         snapshot: StateSnapshot,
///         _ctx: NodeContext,
///     ) -> Result<NodeOutput, NodeError> {
///         let name = snapshot
///             .extra
///             .get("name")
///             .and_then(|v| v.as_str())
///             .ok_or(NodeError::MissingInput { what: "name" })?;
///         let update =
///             NodePartial::new().with_messages(vec![Message::assistant(&format!("Hello, {name}!"))]);
///         Ok(NodeOutput::wired(update))
///     }
/// }
/// ```
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute this node with the given state snapshot and context.
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext)
        -> Result<NodeOutput, NodeError>;

    /// Destinations this node may name in a [`Route::Goto`] directive.
    ///
    /// The graph builder validates these at compile time, so a typo in a
    /// goto target fails the build instead of a live thread. Nodes that only
    /// route via the graph wiring keep the empty default.
    fn goto_targets(&self) -> Vec<NodeKind> {
        Vec::new()
    }
}

/// What a node produces: a state delta plus a routing directive.
#[derive(Clone, Debug, Default)]
pub struct NodeOutput {
    /// Partial state update to merge through the reducers.
    pub update: NodePartial,
    /// Where execution should go next.
    pub route: Route,
}

impl NodeOutput {
    /// Output that defers routing to the graph wiring.
    #[must_use]
    pub fn wired(update: NodePartial) -> Self {
        Self {
            update,
            route: Route::Wired,
        }
    }

    /// Output that routes directly to the named node.
    #[must_use]
    pub fn goto(update: NodePartial, target: NodeKind) -> Self {
        Self {
            update,
            route: Route::Goto(target),
        }
    }

    /// Output that completes the thread's run.
    #[must_use]
    pub fn end(update: NodePartial) -> Self {
        Self {
            update,
            route: Route::End,
        }
    }
}

/// Execution context passed to a node.
///
/// Carries the node's identity, the current super-step, the host-supplied
/// run configuration, and the interrupt replay cursor for this execution.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Identifier of the executing node.
    pub node_id: String,
    /// Current super-step number.
    pub step: u64,
    /// Host-supplied configuration for this thread.
    pub config: RunConfig,
    interrupts: InterruptCursor,
}

impl NodeContext {
    /// Creates a context with an empty interrupt history.
    ///
    /// Mostly useful for exercising nodes directly in tests; the engine
    /// builds contexts with the thread's persisted history.
    #[must_use]
    pub fn new(node_id: impl Into<String>, step: u64, config: RunConfig) -> Self {
        Self {
            node_id: node_id.into(),
            step,
            config,
            interrupts: InterruptCursor::default(),
        }
    }

    pub(crate) fn with_cursor(
        node_id: impl Into<String>,
        step: u64,
        config: RunConfig,
        interrupts: InterruptCursor,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            step,
            config,
            interrupts,
        }
    }

    pub(crate) fn cursor(&self) -> &InterruptCursor {
        &self.interrupts
    }

    /// Requests input from the external actor.
    ///
    /// Returns the recorded response when this call's ordinal already has an
    /// answer in the thread's interrupt history; otherwise returns
    /// [`NodeError::Suspended`], which the node propagates with `?` to
    /// suspend the thread.
    ///
    /// At most one new interrupt surfaces per engine call: each
    /// `run`/`resume` replays answered ordinals and stops at the first
    /// unanswered one.
    pub fn request_input(&self, request: InterruptRequest) -> Result<Value, NodeError> {
        match self.interrupts.take() {
            Some(response) => Ok(response),
            None => Err(NodeError::Suspended(request)),
        }
    }
}

/// Partial state update returned by node execution.
///
/// All fields are optional, allowing nodes to update only the channels they
/// care about. The engine merges partials through the reducer registry:
/// messages append-unique by id, extra keys last-writer-wins.
///
/// # Examples
///
/// ```rust
/// use stepflow::message::Message;
/// use stepflow::node::NodePartial;
/// use stepflow::utils::collections::new_extra_map;
/// use serde_json::json;
///
/// let partial = NodePartial::new().with_messages(vec![Message::assistant("Done")]);
///
/// let mut extra = new_extra_map();
/// extra.insert("status".to_string(), json!("success"));
/// let partial = NodePartial::new()
///     .with_messages(vec![Message::assistant("Processing complete")])
///     .with_extra(extra);
/// ```
#[derive(Clone, Debug, Default)]
pub struct NodePartial {
    /// Messages to append to the thread's conversation.
    pub messages: Option<Vec<Message>>,
    /// Key-value data to merge into the thread's extra channel.
    pub extra: Option<FxHashMap<String, Value>>,
}

impl NodePartial {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the messages delta.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Sets the extra-data delta.
    #[must_use]
    pub fn with_extra(mut self, extra: FxHashMap<String, Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Returns true if this partial changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.as_ref().is_none_or(|m| m.is_empty())
            && self.extra.as_ref().is_none_or(|e| e.is_empty())
    }
}

/// Errors and control signals produced by node execution.
///
/// `Suspended` and `Retryable` are control signals the engine reacts to;
/// everything else is fatal for the super-step (the thread's last checkpoint
/// stays intact and the thread remains usable).
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// The node is waiting on external input.
    ///
    /// Produced by [`NodeContext::request_input`]; the engine persists the
    /// request and suspends the thread rather than treating this as failure.
    #[error("node suspended awaiting input: {}", .0.title)]
    #[diagnostic(
        code(stepflow::node::suspended),
        help("Supply a response via Stepper::resume to continue this thread.")
    )]
    Suspended(InterruptRequest),

    /// Transient failure; the node's retry policy governs re-execution.
    #[error("retryable failure: {message}")]
    #[diagnostic(
        code(stepflow::node::retryable),
        help("The engine retries this node up to its policy's max_attempts.")
    )]
    Retryable { message: String },

    /// A retryable failure exhausted the node's retry policy.
    #[error("node {node} failed after {attempts} attempts: {message}")]
    #[diagnostic(code(stepflow::node::retries_exhausted))]
    RetriesExhausted {
        node: String,
        attempts: u32,
        message: String,
    },

    /// Expected input data is missing from the state snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(stepflow::node::missing_input),
        help("Check that an earlier node produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// An assistant message referenced a tool name with no registered tool.
    #[error("unknown tool: {name}")]
    #[diagnostic(
        code(stepflow::node::unknown_tool),
        help("Register the tool with the ToolRunner before wiring it into the graph.")
    )]
    UnknownTool { name: String },

    /// Input validation failed.
    #[error("validation failed: {0}")]
    #[diagnostic(
        code(stepflow::node::validation),
        help("Check input data format and required fields.")
    )]
    ValidationFailed(String),

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(stepflow::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Routing failed while driving a nested workflow.
    #[error(transparent)]
    #[diagnostic(code(stepflow::node::route))]
    Route(#[from] RouteError),
}

impl NodeError {
    /// Creates a [`NodeError::Retryable`] from any displayable cause.
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        NodeError::Retryable {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_input_suspends_without_history() {
        let ctx = NodeContext::new("n", 0, RunConfig::new("t"));
        let err = ctx
            .request_input(InterruptRequest::confirm("Approve?", "Approve the change"))
            .unwrap_err();
        assert!(matches!(err, NodeError::Suspended(req) if req.kind == "confirm"));
    }

    #[test]
    fn test_request_input_replays_recorded_response() {
        let cursor = InterruptCursor::new(vec![json!("yes")]);
        let ctx = NodeContext::with_cursor("n", 0, RunConfig::new("t"), cursor);
        let req = InterruptRequest::confirm("Approve?", "Approve the change");
        assert_eq!(ctx.request_input(req.clone()).unwrap(), json!("yes"));
        // Second call has no recorded answer and suspends.
        assert!(ctx.request_input(req).is_err());
    }

    #[test]
    fn test_node_partial_is_empty() {
        assert!(NodePartial::new().is_empty());
        assert!(NodePartial::new().with_messages(vec![]).is_empty());
        assert!(!NodePartial::new()
            .with_messages(vec![Message::assistant("hi")])
            .is_empty());
    }
}
