//! GraphBuilder implementation for constructing workflow graphs.
//!
//! This module contains the main GraphBuilder type and its fluent API for
//! declaring nodes, edges, retry policies, and reducers before compiling to
//! an executable [`Workflow`](crate::workflow::Workflow).

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::edges::{ConditionalEdge, ConditionalRouter};
use crate::node::Node;
use crate::reducers::ReducerRegistry;
use crate::retry::RetryPolicy;
use crate::types::NodeKind;

/// Builder for constructing workflow graphs with a fluent API.
///
/// # Required Configuration
///
/// Every graph must have:
/// - at least one executable node added via [`add_node`](Self::add_node),
/// - a static edge from `NodeKind::Start` naming the entry node,
/// - a path from every node to `NodeKind::End`.
///
/// `NodeKind::Start` and `NodeKind::End` are virtual endpoints and are never
/// registered with `add_node`; they exist only for structural definition.
///
/// # Examples
///
/// ```
/// use stepflow::graphs::GraphBuilder;
/// use stepflow::types::NodeKind;
///
/// # struct MyNode;
/// # #[async_trait::async_trait]
/// # impl stepflow::node::Node for MyNode {
/// #     async fn run(&self, _: stepflow::state::StateSnapshot, _: stepflow::node::NodeContext) -> Result<stepflow::node::NodeOutput, stepflow::node::NodeError> {
/// #         Ok(stepflow::node::NodeOutput::wired(stepflow::node::NodePartial::default()))
/// #     }
/// # }
///
/// let workflow = GraphBuilder::new()
///     .add_node(NodeKind::Custom("worker".into()), MyNode)
///     .add_edge(NodeKind::Start, NodeKind::Custom("worker".into()))
///     .add_edge(NodeKind::Custom("worker".into()), NodeKind::End)
///     .compile()
///     .unwrap();
/// ```
pub struct GraphBuilder {
    /// Registry of all nodes in the graph, keyed by their identifier.
    pub nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    /// Unconditional edges defining static graph topology.
    pub edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    /// Conditional edges for dynamic routing based on state.
    pub conditional_edges: Vec<ConditionalEdge>,
    /// Retry policies for nodes registered with one.
    pub retry_policies: FxHashMap<NodeKind, RetryPolicy>,
    /// Reducer registry used to merge node deltas.
    pub reducers: ReducerRegistry,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a new, empty graph builder with the default reducers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            conditional_edges: Vec::new(),
            retry_policies: FxHashMap::default(),
            reducers: ReducerRegistry::default(),
        }
    }

    /// Adds a node to the graph.
    ///
    /// `NodeKind::Start` and `NodeKind::End` are virtual structural
    /// endpoints; passing either here is ignored with a warning. Registering
    /// the same identifier twice replaces the earlier node.
    #[must_use]
    pub fn add_node(mut self, id: NodeKind, node: impl Node + 'static) -> Self {
        match id {
            NodeKind::Start | NodeKind::End => {
                tracing::warn!(
                    ?id,
                    "Ignoring registration of virtual node kind (Start/End are virtual)"
                );
            }
            _ => {
                self.nodes.insert(id, Arc::new(node));
            }
        }
        self
    }

    /// Adds a node together with a retry policy.
    ///
    /// When the node fails with a retryable error, the engine re-invokes it
    /// up to the policy's `max_attempts`, sleeping the backoff delay between
    /// attempts.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use stepflow::graphs::GraphBuilder;
    /// use stepflow::retry::RetryPolicy;
    /// use stepflow::types::NodeKind;
    ///
    /// # struct FlakyNode;
    /// # #[async_trait::async_trait]
    /// # impl stepflow::node::Node for FlakyNode {
    /// #     async fn run(&self, _: stepflow::state::StateSnapshot, _: stepflow::node::NodeContext) -> Result<stepflow::node::NodeOutput, stepflow::node::NodeError> {
    /// #         Ok(stepflow::node::NodeOutput::wired(stepflow::node::NodePartial::default()))
    /// #     }
    /// # }
    ///
    /// let builder = GraphBuilder::new().add_node_with_retry(
    ///     NodeKind::Custom("lookup".into()),
    ///     FlakyNode,
    ///     RetryPolicy::exponential(3, Duration::from_millis(100)),
    /// );
    /// ```
    #[must_use]
    pub fn add_node_with_retry(
        mut self,
        id: NodeKind,
        node: impl Node + 'static,
        policy: RetryPolicy,
    ) -> Self {
        if id.is_custom() {
            self.retry_policies.insert(id.clone(), policy);
        }
        self.add_node(id, node)
    }

    /// Adds an unconditional edge between two nodes.
    ///
    /// When the `from` node completes and neither a goto directive nor a
    /// conditional edge applies, execution follows this edge. Each node may
    /// have at most one static edge; compilation rejects ambiguous wiring.
    #[must_use]
    pub fn add_edge(mut self, from: NodeKind, to: NodeKind) -> Self {
        self.edges.entry(from).or_default().push(to);
        self
    }

    /// Adds a conditional edge to the graph.
    ///
    /// When execution leaves `from`, the router inspects the snapshot taken
    /// after the node's update was merged and returns one of its declared
    /// labels; `targets` maps each label to a destination. Compilation
    /// verifies that every declared label is mapped and every destination is
    /// registered, and allows at most one conditional edge per source node.
    #[must_use]
    pub fn add_conditional_edge<L>(
        mut self,
        from: NodeKind,
        router: Arc<dyn ConditionalRouter>,
        targets: impl IntoIterator<Item = (L, NodeKind)>,
    ) -> Self
    where
        L: Into<String>,
    {
        let targets: FxHashMap<String, NodeKind> = targets
            .into_iter()
            .map(|(label, target)| (label.into(), target))
            .collect();
        self.conditional_edges
            .push(ConditionalEdge::new(from, router, targets));
        self
    }

    /// Replaces the reducer registry used to merge node deltas.
    ///
    /// Defaults to append-unique messages plus last-writer-wins extras;
    /// override only when custom merge semantics are needed.
    #[must_use]
    pub fn with_reducers(mut self, reducers: ReducerRegistry) -> Self {
        self.reducers = reducers;
        self
    }
}
