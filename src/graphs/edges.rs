//! Edge types and routing for conditional graph flow.
//!
//! A conditional edge pairs a router with a finite label set and a map from
//! each label to a destination node. The router inspects the post-merge
//! state snapshot and returns one of its declared labels; the label set is
//! known at build time so compilation can verify every label has a mapped
//! destination.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::state::StateSnapshot;
use crate::types::NodeKind;

/// State-driven router with a declared, finite label set.
///
/// Implementations must only ever return labels listed by
/// [`labels`](ConditionalRouter::labels); the graph builder validates that
/// every declared label maps to a destination, so a conforming router can
/// never produce an unroutable label at runtime.
pub trait ConditionalRouter: Send + Sync {
    /// Every label this router may return.
    fn labels(&self) -> Vec<String>;

    /// Picks a label by inspecting the snapshot taken after the source
    /// node's update was merged.
    fn route(&self, snapshot: &StateSnapshot) -> String;
}

/// A [`ConditionalRouter`] built from a closure plus an explicit label list.
///
/// # Examples
///
/// ```
/// use stepflow::graphs::{ConditionalRouter, FnRouter};
///
/// let router = FnRouter::new(vec!["yes", "no"], |snapshot| {
///     if snapshot.extra.contains_key("approved") {
///         "yes".to_string()
///     } else {
///         "no".to_string()
///     }
/// });
/// assert_eq!(router.labels(), vec!["yes", "no"]);
/// ```
pub struct FnRouter {
    labels: Vec<String>,
    route_fn: Box<dyn Fn(&StateSnapshot) -> String + Send + Sync>,
}

impl FnRouter {
    pub fn new<L, F>(labels: Vec<L>, route_fn: F) -> Self
    where
        L: Into<String>,
        F: Fn(&StateSnapshot) -> String + Send + Sync + 'static,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            route_fn: Box::new(route_fn),
        }
    }
}

impl ConditionalRouter for FnRouter {
    fn labels(&self) -> Vec<String> {
        self.labels.clone()
    }

    fn route(&self, snapshot: &StateSnapshot) -> String {
        (self.route_fn)(snapshot)
    }
}

/// A conditional edge: source node, router, and the label → destination map.
#[derive(Clone)]
pub struct ConditionalEdge {
    from: NodeKind,
    router: Arc<dyn ConditionalRouter>,
    targets: FxHashMap<String, NodeKind>,
}

impl ConditionalEdge {
    pub fn new(
        from: impl Into<NodeKind>,
        router: Arc<dyn ConditionalRouter>,
        targets: FxHashMap<String, NodeKind>,
    ) -> Self {
        Self {
            from: from.into(),
            router,
            targets,
        }
    }

    /// The source node of this conditional edge.
    pub fn from(&self) -> &NodeKind {
        &self.from
    }

    /// The router evaluated when execution leaves the source node.
    pub fn router(&self) -> &Arc<dyn ConditionalRouter> {
        &self.router
    }

    /// The label → destination map.
    pub fn targets(&self) -> &FxHashMap<String, NodeKind> {
        &self.targets
    }

    /// Evaluates the router and resolves its label to a destination.
    pub fn resolve(&self, snapshot: &StateSnapshot) -> Option<(String, NodeKind)> {
        let label = self.router.route(snapshot);
        let target = self.targets.get(&label).cloned();
        target.map(|t| (label, t))
    }
}
