//! Workflow graph definition and compilation.
//!
//! A workflow graph is defined with the fluent [`GraphBuilder`] API: register
//! nodes, wire static edges, attach conditional edges, then
//! [`compile`](GraphBuilder::compile) into an executable
//! [`Workflow`](crate::workflow::Workflow). Compilation validates the
//! topology so that routing mistakes fail at build time rather than inside a
//! live thread.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stepflow::graphs::{FnRouter, GraphBuilder};
//! use stepflow::types::NodeKind;
//! # use stepflow::node::{Node, NodeContext, NodeError, NodeOutput, NodePartial};
//! # use stepflow::state::StateSnapshot;
//! # struct MyNode;
//! # #[async_trait::async_trait]
//! # impl Node for MyNode {
//! #     async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeOutput, NodeError> {
//! #         Ok(NodeOutput::wired(NodePartial::default()))
//! #     }
//! # }
//!
//! let router = FnRouter::new(vec!["billing", "other"], |snapshot| {
//!     if snapshot.extra.contains_key("invoice_id") {
//!         "billing".to_string()
//!     } else {
//!         "other".to_string()
//!     }
//! });
//!
//! let workflow = GraphBuilder::new()
//!     .add_node(NodeKind::Custom("triage".into()), MyNode)
//!     .add_node(NodeKind::Custom("billing".into()), MyNode)
//!     .add_node(NodeKind::Custom("other".into()), MyNode)
//!     .add_edge(NodeKind::Start, NodeKind::Custom("triage".into()))
//!     .add_conditional_edge(
//!         NodeKind::Custom("triage".into()),
//!         Arc::new(router),
//!         [
//!             ("billing", NodeKind::Custom("billing".into())),
//!             ("other", NodeKind::Custom("other".into())),
//!         ],
//!     )
//!     .add_edge(NodeKind::Custom("billing".into()), NodeKind::End)
//!     .add_edge(NodeKind::Custom("other".into()), NodeKind::End)
//!     .compile()
//!     .unwrap();
//! ```

mod builder;
mod compilation;
mod edges;

pub use builder::GraphBuilder;
pub use compilation::GraphBuildError;
pub use edges::{ConditionalEdge, ConditionalRouter, FnRouter};
