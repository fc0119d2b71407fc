//! # Stepflow: Durable Graph-driven Workflow Engine
//!
//! Stepflow executes directed graphs of async nodes against one mutable,
//! versioned state record per conversational thread, one node per
//! super-step, with durable checkpoints between steps.
//!
//! ## Core Concepts
//!
//! - **Nodes**: Async units of work that read a state snapshot and return a
//!   delta plus a routing directive
//! - **State**: Versioned channels merged by reducers (append-unique
//!   messages, last-writer-wins extras)
//! - **Graph**: Declarative wiring with static and conditional edges,
//!   validated at compile time
//! - **Interrupts**: Restart-surviving mid-node suspension with
//!   deterministic replay
//! - **Stepper**: The execution engine driving threads over a pluggable
//!   checkpoint store
//! - **Streaming**: Incremental per-subscriber event streams with
//!   message-level dedup
//!
//! ## Quick Start
//!
//! ### Defining a node
//!
//! ```
//! use async_trait::async_trait;
//! use stepflow::message::Message;
//! use stepflow::node::{Node, NodeContext, NodeError, NodeOutput, NodePartial};
//! use stepflow::state::StateSnapshot;
//!
//! struct GreetingNode;
//!
//! #[async_trait]
//! impl Node for GreetingNode {
//!     async fn run(
//!         &self,
//!         _snapshot: StateSnapshot,
//!         _ctx: NodeContext,
//!     ) -> Result<NodeOutput, NodeError> {
//!         let update =
//!             NodePartial::new().with_messages(vec![Message::assistant("How can I help?")]);
//!         Ok(NodeOutput::wired(update))
//!     }
//! }
//! ```
//!
//! ### Building and running a workflow
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stepflow::graphs::GraphBuilder;
//! use stepflow::runtimes::{InMemoryCheckpointer, RunConfig, Stepper};
//! use stepflow::state::ThreadState;
//! use stepflow::types::NodeKind;
//! # use async_trait::async_trait;
//! # use stepflow::node::{Node, NodeContext, NodeError, NodeOutput, NodePartial};
//! # use stepflow::state::StateSnapshot;
//! # struct GreetingNode;
//! # #[async_trait]
//! # impl Node for GreetingNode {
//! #     async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeOutput, NodeError> {
//! #         Ok(NodeOutput::wired(NodePartial::default()))
//! #     }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = GraphBuilder::new()
//!     .add_node(NodeKind::Custom("greet".into()), GreetingNode)
//!     .add_edge(NodeKind::Start, NodeKind::Custom("greet".into()))
//!     .add_edge(NodeKind::Custom("greet".into()), NodeKind::End)
//!     .compile()?;
//!
//! let mut stepper = Stepper::new(workflow, Arc::new(InMemoryCheckpointer::new()));
//! stepper
//!     .create_thread(
//!         "thread-1",
//!         RunConfig::new("thread-1"),
//!         ThreadState::new_with_user_message("Hi!"),
//!     )
//!     .await?;
//! let outcome = stepper.run("thread-1", Default::default()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Suspending for external input
//!
//! Inside a node, [`NodeContext::request_input`](node::NodeContext::request_input)
//! suspends the thread until the host answers via
//! [`Stepper::resume`](runtimes::Stepper::resume):
//!
//! ```rust,ignore
//! let answer = ctx.request_input(InterruptRequest::confirm(
//!     "Confirm change",
//!     "Apply the requested account change?",
//! ))?;
//! ```
//!
//! The suspension is checkpointed, so it survives a process restart; on
//! resume the node re-executes from the top and answered requests replay
//! instantly.
//!
//! ## Module Guide
//!
//! - [`message`] - Messages and tool calls
//! - [`state`] - Versioned thread state and snapshots
//! - [`node`] - Node trait and execution primitives
//! - [`graphs`] - Workflow definition and compile-time validation
//! - [`workflow`] - The compiled, executable graph
//! - [`runtimes`] - Stepper, sessions, and checkpointing
//! - [`interrupts`] - Suspension requests and replay cursors
//! - [`subgraph`] - Nesting compiled workflows as nodes
//! - [`tools`] - Tool trait and the tool-runner node
//! - [`event_stream`] - Incremental execution events with dedup
//! - [`reducers`] - State merge strategies
//! - [`channels`] - Versioned state storage

pub mod channels;
pub mod control;
pub mod event_stream;
pub mod graphs;
pub mod interrupts;
pub mod message;
pub mod node;
pub mod reducers;
pub mod retry;
pub mod runtimes;
pub mod state;
pub mod subgraph;
pub mod telemetry;
pub mod tools;
pub mod types;
pub mod utils;
pub mod workflow;
