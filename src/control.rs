//! Control-flow primitives emitted by nodes to influence routing.
//!
//! Routing directives are kept separate from state updates so nodes can
//! express where execution should go next without mutating application state
//! directly. The stepper reconciles a node's directive with the graph's
//! conditional and static edges after merging the node's state delta.

use crate::types::NodeKind;

/// Routing directive returned by a node alongside its state delta.
///
/// Resolution precedence in the stepper is `Goto` > conditional edge >
/// static edge > `End`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// Route directly to the named node, overriding the graph wiring.
    ///
    /// Nodes that use this must declare their possible destinations via
    /// [`Node::goto_targets`](crate::node::Node::goto_targets) so the graph
    /// builder can validate them.
    Goto(NodeKind),
    /// Defer to the graph wiring (conditional edge, then static edge).
    Wired,
    /// Complete the thread's run.
    End,
}

impl Route {
    /// Returns true if this directive defers to the graph wiring.
    #[must_use]
    pub fn is_wired(&self) -> bool {
        matches!(self, Route::Wired)
    }
}

impl Default for Route {
    fn default() -> Self {
        Route::Wired
    }
}

impl From<NodeKind> for Route {
    fn from(kind: NodeKind) -> Self {
        Route::Goto(kind)
    }
}
