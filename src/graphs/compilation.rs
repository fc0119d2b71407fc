//! Graph compilation and structural validation.
//!
//! Compiling a [`GraphBuilder`](super::GraphBuilder) checks the declared
//! topology before any thread runs: every edge, conditional label, and goto
//! declaration must resolve to a registered node (or `End`), the graph must
//! have an entry, and every registered node must be able to reach `End`.

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::types::NodeKind;
use crate::workflow::Workflow;

/// Structural errors reported by [`GraphBuilder::compile`](super::GraphBuilder::compile).
#[derive(Debug, Error, Diagnostic)]
pub enum GraphBuildError {
    /// No static edge leaves `Start`, so the graph has no entry node.
    #[error("graph has no entry: add a static edge from Start")]
    #[diagnostic(
        code(stepflow::graph::missing_entry),
        help("Wire the entry with .add_edge(NodeKind::Start, <entry node>).")
    )]
    MissingEntry,

    /// A static edge names a target that is neither registered nor `End`.
    #[error("edge {from} -> {to} targets an unregistered node")]
    #[diagnostic(
        code(stepflow::graph::unknown_edge_target),
        help("Register the target with add_node, or route to NodeKind::End.")
    )]
    UnknownEdgeTarget { from: String, to: String },

    /// A node declares a goto destination that is neither registered nor `End`.
    #[error("node {node} declares goto target {target}, which is not registered")]
    #[diagnostic(
        code(stepflow::graph::unknown_goto_target),
        help("Every destination returned via Route::Goto must be a registered node or End.")
    )]
    UnknownGotoTarget { node: String, target: String },

    /// A conditional router declares a label with no mapped destination.
    #[error("conditional edge from {from} declares label {label:?} with no mapped target")]
    #[diagnostic(
        code(stepflow::graph::unmapped_label),
        help("Add the label to the target map passed to add_conditional_edge.")
    )]
    UnmappedLabel { from: String, label: String },

    /// A conditional label maps to a target that is neither registered nor `End`.
    #[error("conditional edge from {from} maps label {label:?} to unregistered node {target}")]
    #[diagnostic(code(stepflow::graph::unknown_label_target))]
    UnknownLabelTarget {
        from: String,
        label: String,
        target: String,
    },

    /// More than one conditional edge was attached to the same source node.
    #[error("node {from} has more than one conditional edge")]
    #[diagnostic(
        code(stepflow::graph::duplicate_conditional),
        help("Merge the routers into one conditional edge per source node.")
    )]
    DuplicateConditional { from: String },

    /// A node has more than one static edge; one node executes per
    /// super-step, so fan-out wiring is rejected.
    #[error("node {from} has {count} static edges; at most one is allowed")]
    #[diagnostic(
        code(stepflow::graph::ambiguous_edge),
        help("Use a conditional edge or Route::Goto for state-dependent routing.")
    )]
    AmbiguousEdge { from: String, count: usize },

    /// A registered node has no outgoing route at all.
    #[error("node {node} has no outgoing route")]
    #[diagnostic(
        code(stepflow::graph::dead_end),
        help("Add a static edge, a conditional edge, or declare goto targets for this node.")
    )]
    DeadEnd { node: String },

    /// A registered node cannot reach `End` over any declared route.
    #[error("node {node} has no path to End")]
    #[diagnostic(
        code(stepflow::graph::no_path_to_end),
        help("Check the wiring: every node must be able to complete the run.")
    )]
    NoPathToEnd { node: String },
}

impl super::builder::GraphBuilder {
    /// Compiles the graph into an executable [`Workflow`].
    ///
    /// # Errors
    ///
    /// Returns a [`GraphBuildError`] when the topology is invalid; see the
    /// variants for the individual checks.
    pub fn compile(self) -> Result<Workflow, GraphBuildError> {
        let Self {
            nodes,
            edges,
            conditional_edges,
            retry_policies,
            reducers,
        } = self;

        let is_known =
            |kind: &NodeKind| -> bool { kind.is_end() || nodes.contains_key(kind) };

        // One static edge per node; unknown targets rejected.
        let mut static_edges: FxHashMap<NodeKind, NodeKind> = FxHashMap::default();
        for (from, targets) in &edges {
            if targets.len() > 1 {
                return Err(GraphBuildError::AmbiguousEdge {
                    from: from.to_string(),
                    count: targets.len(),
                });
            }
            if let Some(to) = targets.first() {
                if !is_known(to) {
                    return Err(GraphBuildError::UnknownEdgeTarget {
                        from: from.to_string(),
                        to: to.to_string(),
                    });
                }
                static_edges.insert(from.clone(), to.clone());
            }
        }

        // The single Start edge names the entry node.
        if !static_edges.contains_key(&NodeKind::Start) {
            return Err(GraphBuildError::MissingEntry);
        }

        // One conditional edge per source; every declared label mapped to a
        // known destination.
        let mut conditionals: FxHashMap<NodeKind, super::edges::ConditionalEdge> =
            FxHashMap::default();
        for edge in conditional_edges {
            let from = edge.from().clone();
            if conditionals.contains_key(&from) {
                return Err(GraphBuildError::DuplicateConditional {
                    from: from.to_string(),
                });
            }
            for label in edge.router().labels() {
                match edge.targets().get(&label) {
                    None => {
                        return Err(GraphBuildError::UnmappedLabel {
                            from: from.to_string(),
                            label,
                        });
                    }
                    Some(target) if !is_known(target) => {
                        return Err(GraphBuildError::UnknownLabelTarget {
                            from: from.to_string(),
                            label,
                            target: target.to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }
            conditionals.insert(from, edge);
        }

        // Declared goto destinations must resolve.
        for (kind, node) in &nodes {
            for target in node.goto_targets() {
                if !is_known(&target) {
                    return Err(GraphBuildError::UnknownGotoTarget {
                        node: kind.to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }

        // Union of outgoing routes per registered node, for the dead-end and
        // reachability checks.
        let mut successors: FxHashMap<NodeKind, FxHashSet<NodeKind>> = FxHashMap::default();
        for (kind, node) in &nodes {
            let mut out: FxHashSet<NodeKind> = FxHashSet::default();
            if let Some(to) = static_edges.get(kind) {
                out.insert(to.clone());
            }
            if let Some(edge) = conditionals.get(kind) {
                out.extend(edge.targets().values().cloned());
            }
            out.extend(node.goto_targets());
            if out.is_empty() {
                return Err(GraphBuildError::DeadEnd {
                    node: kind.to_string(),
                });
            }
            successors.insert(kind.clone(), out);
        }

        // Reverse reachability from End.
        let mut reaches_end: FxHashSet<NodeKind> = FxHashSet::default();
        let mut frontier: Vec<NodeKind> = vec![NodeKind::End];
        while let Some(current) = frontier.pop() {
            for (kind, out) in &successors {
                if out.contains(&current) && reaches_end.insert(kind.clone()) {
                    frontier.push(kind.clone());
                }
            }
        }
        for kind in nodes.keys() {
            if !reaches_end.contains(kind) {
                return Err(GraphBuildError::NoPathToEnd {
                    node: kind.to_string(),
                });
            }
        }

        Ok(Workflow::from_parts(
            nodes,
            static_edges,
            conditionals,
            retry_policies,
            reducers,
        ))
    }
}
