//! Nested workflows.
//!
//! [`SubgraphNode`] mounts a compiled child [`Workflow`] as a single node of
//! a parent graph. The child sees only the state `map_in` projects for it,
//! runs inline from its entry to `End` within the parent node's execution,
//! and its final snapshot is projected back into a parent delta by
//! `map_out`.
//!
//! Interrupts nest transparently: the child shares the parent's interrupt
//! cursor, so a suspension inside the child suspends the parent node, and
//! resuming replays the whole child run up to the nested `request_input`
//! call with the same global ordinals.

use std::sync::Arc;

use async_trait::async_trait;

use crate::node::{Node, NodeContext, NodeError, NodeOutput, NodePartial};
use crate::state::{StateSnapshot, ThreadState};
use crate::types::NodeKind;
use crate::workflow::Workflow;

type MapIn = Arc<dyn Fn(&StateSnapshot) -> ThreadState + Send + Sync>;
type MapOut = Arc<dyn Fn(&StateSnapshot) -> NodePartial + Send + Sync>;

/// A node that runs a nested workflow.
///
/// # Examples
///
/// ```rust,no_run
/// use stepflow::channels::Channel;
/// use stepflow::graphs::GraphBuilder;
/// use stepflow::node::NodePartial;
/// use stepflow::state::ThreadState;
/// use stepflow::subgraph::SubgraphNode;
/// use stepflow::types::NodeKind;
/// use stepflow::utils::collections::new_extra_map;
///
/// # fn child_workflow() -> stepflow::workflow::Workflow { unimplemented!() }
/// let child = child_workflow();
///
/// let nested = SubgraphNode::new(
///     child,
///     |parent| {
///         // The child only sees what map_in projects.
///         let mut state = ThreadState::default();
///         if let Some(topic) = parent.extra.get("topic") {
///             state.extra.get_mut().insert("topic".to_string(), topic.clone());
///         }
///         state
///     },
///     |child| {
///         let mut extra = new_extra_map();
///         if let Some(result) = child.extra.get("result") {
///             extra.insert("child_result".to_string(), result.clone());
///         }
///         NodePartial::new().with_extra(extra)
///     },
/// );
///
/// let builder = GraphBuilder::new().add_node(NodeKind::Custom("nested".into()), nested);
/// ```
pub struct SubgraphNode {
    child: Arc<Workflow>,
    map_in: MapIn,
    map_out: MapOut,
    route_to: Option<NodeKind>,
}

impl SubgraphNode {
    /// Mounts `child` behind the given state projections.
    ///
    /// - `map_in` builds the child's initial state from the parent snapshot;
    ///   anything it does not copy is invisible to the child.
    /// - `map_out` projects the child's final snapshot into the parent
    ///   delta; anything it does not copy never reaches the parent.
    pub fn new(
        child: Workflow,
        map_in: impl Fn(&StateSnapshot) -> ThreadState + Send + Sync + 'static,
        map_out: impl Fn(&StateSnapshot) -> NodePartial + Send + Sync + 'static,
    ) -> Self {
        Self {
            child: Arc::new(child),
            map_in: Arc::new(map_in),
            map_out: Arc::new(map_out),
            route_to: None,
        }
    }

    /// Routes to the named parent node on completion instead of deferring
    /// to the parent's wiring.
    #[must_use]
    pub fn with_route_to(mut self, target: NodeKind) -> Self {
        self.route_to = Some(target);
        self
    }
}

#[async_trait]
impl Node for SubgraphNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let mut child_state = (self.map_in)(&snapshot);
        // A nested suspension propagates out through `?` as this node's own.
        self.child.run_inline(&mut child_state, &ctx).await?;
        let update = (self.map_out)(&child_state.snapshot());
        Ok(match &self.route_to {
            Some(target) => NodeOutput::goto(update, target.clone()),
            None => NodeOutput::wired(update),
        })
    }

    fn goto_targets(&self) -> Vec<NodeKind> {
        self.route_to.iter().cloned().collect()
    }
}
