//! Thread runtime: session management, durable checkpoints, and the stepper.
//!
//! This module provides the execution layer that drives compiled workflows
//! against per-thread state with restart-surviving suspension.
//!
//! # Architecture
//!
//! - **[`Stepper`]** - Orchestrator driving one node per super-step
//! - **[`Checkpointer`]** - Trait for pluggable checkpoint persistence
//! - **[`ThreadSession`]** - In-memory execution state of one thread
//! - **[`RunConfig`]** - Host-supplied, trusted per-thread configuration
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stepflow::runtimes::{InMemoryCheckpointer, RunConfig, RunOutcome, Stepper};
//! use stepflow::state::ThreadState;
//! # use stepflow::workflow::Workflow;
//! # async fn example(workflow: Workflow) -> Result<(), Box<dyn std::error::Error>> {
//!
//! let mut stepper = Stepper::new(workflow, Arc::new(InMemoryCheckpointer::new()));
//! let initial = ThreadState::new_with_user_message("Hello");
//!
//! stepper
//!     .create_thread("thread-1", RunConfig::new("thread-1"), initial)
//!     .await?;
//! match stepper.run("thread-1", Default::default()).await? {
//!     RunOutcome::Completed { state } => println!("{} messages", state.messages.len()),
//!     RunOutcome::Interrupted { request } => println!("waiting on: {}", request.title),
//! }
//! # Ok(())
//! # }
//! ```

pub mod checkpointer;
pub mod runtime_config;
pub mod session;
pub mod stepper;

pub use checkpointer::{Checkpoint, Checkpointer, CheckpointerError, InMemoryCheckpointer};
pub use runtime_config::RunConfig;
pub use session::{ThreadInit, ThreadSession};
pub use stepper::{RunOutcome, StepError, Stepper};
