//! Compiled workflow: the read-only execution tables built by graph
//! compilation, plus the node-level execution helpers the stepper and the
//! subgraph adapter share.
//!
//! A [`Workflow`] owns the node registry, the routing tables, the per-node
//! retry policies, and the reducer registry. It is immutable after
//! compilation, so it can be shared behind an `Arc` by every thread the
//! engine drives.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::instrument;

use crate::control::Route;
use crate::graphs::ConditionalEdge;
use crate::node::{Node, NodeContext, NodeError, NodeOutput, NodePartial};
use crate::reducers::{ReducerError, ReducerRegistry};
use crate::retry::RetryPolicy;
use crate::state::{StateSnapshot, ThreadState};
use crate::types::NodeKind;

/// Routing failures surfaced while resolving where execution goes next.
#[derive(Debug, Error, Diagnostic)]
pub enum RouteError {
    /// A route names a node the workflow does not know.
    #[error("route targets unknown node: {node}")]
    #[diagnostic(
        code(stepflow::route::unknown_node),
        help("Goto destinations must be registered nodes or End.")
    )]
    UnknownNode { node: String },

    /// A conditional router returned a label outside its declared set.
    #[error("conditional router on {from} returned unmapped label {label:?}")]
    #[diagnostic(
        code(stepflow::route::unmapped_label),
        help("Routers must only return labels they declare via labels().")
    )]
    UnmappedLabel { from: String, label: String },
}

/// A compiled, executable workflow graph.
///
/// Produced by [`GraphBuilder::compile`](crate::graphs::GraphBuilder::compile);
/// all tables are validated and read-only from then on.
#[derive(Clone)]
pub struct Workflow {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    edges: FxHashMap<NodeKind, NodeKind>,
    conditional_edges: FxHashMap<NodeKind, ConditionalEdge>,
    retry_policies: FxHashMap<NodeKind, RetryPolicy>,
    reducers: ReducerRegistry,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field(
                "conditional_edges",
                &self.conditional_edges.keys().collect::<Vec<_>>(),
            )
            .field("retry_policies", &self.retry_policies)
            .finish_non_exhaustive()
    }
}

impl Workflow {
    pub(crate) fn from_parts(
        nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
        edges: FxHashMap<NodeKind, NodeKind>,
        conditional_edges: FxHashMap<NodeKind, ConditionalEdge>,
        retry_policies: FxHashMap<NodeKind, RetryPolicy>,
        reducers: ReducerRegistry,
    ) -> Self {
        Self {
            nodes,
            edges,
            conditional_edges,
            retry_policies,
            reducers,
        }
    }

    /// The entry node, named by the static edge leaving `Start`.
    #[must_use]
    pub fn entry(&self) -> NodeKind {
        // Compilation guarantees the Start edge exists.
        self.edges
            .get(&NodeKind::Start)
            .cloned()
            .unwrap_or(NodeKind::End)
    }

    /// The registered nodes.
    #[must_use]
    pub fn nodes(&self) -> &FxHashMap<NodeKind, Arc<dyn Node>> {
        &self.nodes
    }

    /// The static edges.
    #[must_use]
    pub fn edges(&self) -> &FxHashMap<NodeKind, NodeKind> {
        &self.edges
    }

    /// The conditional edges, keyed by source node.
    #[must_use]
    pub fn conditional_edges(&self) -> &FxHashMap<NodeKind, ConditionalEdge> {
        &self.conditional_edges
    }

    /// Looks up a registered node implementation.
    pub fn node(&self, kind: &NodeKind) -> Result<&Arc<dyn Node>, RouteError> {
        self.nodes.get(kind).ok_or_else(|| RouteError::UnknownNode {
            node: kind.to_string(),
        })
    }

    /// Merges a node's partial update into the state via the reducers.
    pub fn apply_update(
        &self,
        state: &mut ThreadState,
        update: &NodePartial,
    ) -> Result<(), ReducerError> {
        self.reducers.apply_all(state, update)
    }

    /// Resolves where execution goes after `from`, given the node's routing
    /// directive and the post-merge snapshot.
    ///
    /// Precedence: `Goto` > conditional edge > static edge > `End`.
    pub fn resolve_route(
        &self,
        from: &NodeKind,
        route: &Route,
        snapshot: &StateSnapshot,
    ) -> Result<NodeKind, RouteError> {
        match route {
            Route::End => Ok(NodeKind::End),
            Route::Goto(target) => {
                if target.is_end() || self.nodes.contains_key(target) {
                    Ok(target.clone())
                } else {
                    Err(RouteError::UnknownNode {
                        node: target.to_string(),
                    })
                }
            }
            Route::Wired => {
                if let Some(edge) = self.conditional_edges.get(from) {
                    let label = edge.router().route(snapshot);
                    return match edge.targets().get(&label) {
                        Some(target) => Ok(target.clone()),
                        None => Err(RouteError::UnmappedLabel {
                            from: from.to_string(),
                            label,
                        }),
                    };
                }
                if let Some(target) = self.edges.get(from) {
                    return Ok(target.clone());
                }
                Ok(NodeKind::End)
            }
        }
    }

    /// Invokes a node under its retry policy.
    ///
    /// A [`NodeError::Retryable`] failure re-invokes the node up to the
    /// policy's `max_attempts`, sleeping the backoff delay between attempts
    /// and rewinding the interrupt cursor so every attempt sees the same
    /// replay ordinals. Suspensions and other errors pass straight through.
    #[instrument(skip(self, snapshot, ctx), fields(node = %kind))]
    pub async fn run_node_with_retry(
        &self,
        kind: &NodeKind,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeOutput, NodeError> {
        let node = self.node(kind)?.clone();
        let policy = self
            .retry_policies
            .get(kind)
            .cloned()
            .unwrap_or_default();
        let mark = ctx.cursor().position();

        let mut attempt: u32 = 1;
        loop {
            match node.run(snapshot.clone(), ctx.clone()).await {
                Err(NodeError::Retryable { message }) => {
                    if attempt >= policy.max_attempts {
                        return Err(NodeError::RetriesExhausted {
                            node: kind.to_string(),
                            attempts: attempt,
                            message,
                        });
                    }
                    tracing::warn!(
                        node = %kind,
                        attempt,
                        max_attempts = policy.max_attempts,
                        %message,
                        "retryable node failure, backing off"
                    );
                    ctx.cursor().rewind(mark);
                    tokio::time::sleep(policy.delay(attempt)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Drives this workflow inline from its entry to `End`, mutating `state`
    /// in place.
    ///
    /// Used by the subgraph adapter: the child runs inside one parent node
    /// execution, shares the parent's interrupt cursor (so a nested
    /// suspension propagates out as the parent's), and performs no
    /// checkpointing of its own.
    pub async fn run_inline(
        &self,
        state: &mut ThreadState,
        ctx: &NodeContext,
    ) -> Result<(), NodeError> {
        let mut current = self.entry();
        while !current.is_end() {
            let snapshot = state.snapshot();
            let child_ctx = NodeContext::with_cursor(
                format!("{}/{}", ctx.node_id, current),
                ctx.step,
                ctx.config.clone(),
                ctx.cursor().clone(),
            );
            let output = self
                .run_node_with_retry(&current, snapshot, child_ctx)
                .await?;
            self.apply_update(state, &output.update)
                .map_err(|e| NodeError::ValidationFailed(e.to_string()))?;
            current = self.resolve_route(&current, &output.route, &state.snapshot())?;
        }
        Ok(())
    }
}
