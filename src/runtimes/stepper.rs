//! The execution engine: one node per super-step, durable between steps.
//!
//! The [`Stepper`] drives a compiled workflow against per-thread sessions.
//! Each super-step executes exactly one node, merges its delta through the
//! reducers, resolves the next node on the merged snapshot, persists a
//! checkpoint, and only then commits the merged state to the session
//! (merge-then-persist atomicity). A suspension checkpoints the pending
//! request with the state unchanged, so an interrupt survives a process
//! restart and resumes on any process that loads the checkpoint.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::event_stream::{EventEmitter, EventStream, StreamEvent};
use crate::interrupts::{InterruptCursor, InterruptRequest};
use crate::message::Message;
use crate::node::{NodeContext, NodeError, NodePartial};
use crate::reducers::ReducerError;
use crate::runtimes::checkpointer::{Checkpoint, Checkpointer, CheckpointerError};
use crate::runtimes::runtime_config::RunConfig;
use crate::runtimes::session::{ThreadInit, ThreadSession};
use crate::state::{StateSnapshot, ThreadState};
use crate::workflow::{RouteError, Workflow};

/// How a `run`/`resume` call ended.
#[derive(Clone, Debug)]
pub enum RunOutcome {
    /// The run reached `End`; the snapshot is the final committed state.
    Completed { state: StateSnapshot },
    /// The thread suspended awaiting input for this request.
    Interrupted { request: InterruptRequest },
}

/// Errors surfaced by the stepper.
#[derive(Debug, Error, Diagnostic)]
pub enum StepError {
    /// No session exists for the thread id.
    #[error("unknown thread: {thread_id}")]
    #[diagnostic(
        code(stepflow::stepper::thread_not_found),
        help("Create the thread first with Stepper::create_thread.")
    )]
    ThreadNotFound { thread_id: String },

    /// `run` was called while the thread is suspended.
    #[error("thread {thread_id} is awaiting an interrupt response")]
    #[diagnostic(
        code(stepflow::stepper::pending_interrupt),
        help("Answer the pending interrupt with Stepper::resume before sending new input.")
    )]
    PendingInterrupt { thread_id: String },

    /// `resume` was called with no interrupt pending.
    #[error("thread {thread_id} has no pending interrupt")]
    #[diagnostic(
        code(stepflow::stepper::no_pending_interrupt),
        help("Use Stepper::run to send regular input to a thread that is not suspended.")
    )]
    NoPendingInterrupt { thread_id: String },

    /// A node failed fatally; the thread's last checkpoint is intact.
    #[error("node {node} failed")]
    #[diagnostic(code(stepflow::stepper::node_failed))]
    NodeFailed {
        node: String,
        #[source]
        source: NodeError,
    },

    /// Merging a node delta failed.
    #[error(transparent)]
    #[diagnostic(code(stepflow::stepper::reducer))]
    Reducer(#[from] ReducerError),

    /// The checkpoint store failed; the super-step is not committed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Checkpointer(#[from] CheckpointerError),

    /// Routing failed after a node completed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Route(#[from] RouteError),
}

/// Drives workflow threads one super-step at a time.
///
/// Holds the compiled workflow, the checkpoint store, the event emitter, and
/// the in-memory sessions. One logical execution runs per thread; distinct
/// threads are independent.
pub struct Stepper {
    workflow: Arc<Workflow>,
    checkpointer: Arc<dyn Checkpointer>,
    emitter: EventEmitter,
    sessions: FxHashMap<String, ThreadSession>,
}

impl Stepper {
    /// Creates a stepper over a compiled workflow and a checkpoint store.
    #[must_use]
    pub fn new(workflow: Workflow, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            workflow: Arc::new(workflow),
            checkpointer,
            emitter: EventEmitter::new(),
            sessions: FxHashMap::default(),
        }
    }

    /// Registers a new event subscriber observing execution from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        self.emitter.subscribe()
    }

    /// Read access to a thread's session.
    #[must_use]
    pub fn thread(&self, thread_id: &str) -> Option<&ThreadSession> {
        self.sessions.get(thread_id)
    }

    /// Creates a thread session, restoring from the latest checkpoint when
    /// one exists.
    ///
    /// A fresh thread starts at the workflow's entry node with the given
    /// initial state and writes its first checkpoint immediately. A restored
    /// thread picks up exactly where its checkpoint left off, including a
    /// pending interrupt; `config` is re-injected by the host either way.
    #[instrument(skip(self, config, initial))]
    pub async fn create_thread(
        &mut self,
        thread_id: &str,
        config: RunConfig,
        initial: ThreadState,
    ) -> Result<ThreadInit, StepError> {
        if let Some(session) = self.sessions.get(thread_id) {
            return Ok(ThreadInit::Resumed {
                checkpoint_step: session.step,
            });
        }

        if let Some(checkpoint) = self.checkpointer.load_latest(thread_id).await? {
            let checkpoint_step = checkpoint.step;
            tracing::info!(thread_id, checkpoint_step, "restoring thread from checkpoint");
            self.sessions
                .insert(thread_id.to_string(), checkpoint.into_session(config));
            return Ok(ThreadInit::Resumed { checkpoint_step });
        }

        let session = ThreadSession {
            thread_id: thread_id.to_string(),
            config,
            state: initial,
            next_node: self.workflow.entry(),
            pending_interrupt: None,
            interrupt_history: Vec::new(),
            step: 0,
        };
        self.checkpointer
            .save(Checkpoint::from_session(&session))
            .await?;
        self.sessions.insert(thread_id.to_string(), session);
        Ok(ThreadInit::Fresh)
    }

    /// Merges `input` into the thread's state and runs super-steps until the
    /// graph reaches `End` or a node suspends.
    ///
    /// Errors with [`StepError::PendingInterrupt`] while an interrupt is
    /// unanswered. A completed thread accepts further runs, re-entering the
    /// graph at its entry node.
    #[instrument(skip(self, input))]
    pub async fn run(
        &mut self,
        thread_id: &str,
        input: NodePartial,
    ) -> Result<RunOutcome, StepError> {
        let workflow = Arc::clone(&self.workflow);
        let checkpointer = Arc::clone(&self.checkpointer);
        let emitter = self.emitter.clone();
        let session = self
            .sessions
            .get_mut(thread_id)
            .ok_or_else(|| StepError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })?;

        if session.pending_interrupt.is_some() {
            return Err(StepError::PendingInterrupt {
                thread_id: thread_id.to_string(),
            });
        }
        if session.next_node.is_end() {
            session.next_node = workflow.entry();
        }
        if !input.is_empty() {
            // Merge onto a working copy and persist before committing, so a
            // failed save drops the input from memory and store alike.
            let mut working = session.state.clone();
            workflow.apply_update(&mut working, &input)?;
            let mut candidate = Checkpoint::from_session(session);
            candidate.state = working.clone();
            if let Err(err) = checkpointer.save(candidate).await {
                emitter.emit(&StreamEvent::Error {
                    message: err.to_string(),
                    step: session.step,
                });
                return Err(err.into());
            }
            session.state = working;
        }

        self.drive(thread_id).await
    }

    /// Convenience wrapper: runs the thread with one new user message.
    pub async fn send_user_message(
        &mut self,
        thread_id: &str,
        content: &str,
    ) -> Result<RunOutcome, StepError> {
        self.run(
            thread_id,
            NodePartial::new().with_messages(vec![Message::user(content)]),
        )
        .await
    }

    /// Answers the pending interrupt and continues execution.
    ///
    /// The response is appended to the thread's interrupt history and
    /// checkpointed before the node re-executes, so a crash between answer
    /// and completion cannot lose it. The node then replays from the top:
    /// answered `request_input` ordinals return instantly, and the first
    /// unanswered one suspends again. At most one new interrupt surfaces per
    /// call.
    #[instrument(skip(self, response))]
    pub async fn resume(
        &mut self,
        thread_id: &str,
        response: Value,
    ) -> Result<RunOutcome, StepError> {
        let checkpointer = Arc::clone(&self.checkpointer);
        let emitter = self.emitter.clone();
        let session = self
            .sessions
            .get_mut(thread_id)
            .ok_or_else(|| StepError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })?;

        if session.pending_interrupt.is_none() {
            return Err(StepError::NoPendingInterrupt {
                thread_id: thread_id.to_string(),
            });
        }

        session.interrupt_history.push(response);
        let request = session.pending_interrupt.take();
        if let Err(err) = checkpointer.save(Checkpoint::from_session(session)).await {
            // The answer is not durable; roll the session back so a retried
            // resume is accepted.
            session.interrupt_history.pop();
            session.pending_interrupt = request;
            emitter.emit(&StreamEvent::Error {
                message: err.to_string(),
                step: session.step,
            });
            return Err(err.into());
        }

        self.drive(thread_id).await
    }

    /// Runs super-steps until `End`, a suspension, or a failure.
    async fn drive(&mut self, thread_id: &str) -> Result<RunOutcome, StepError> {
        let workflow = Arc::clone(&self.workflow);
        let checkpointer = Arc::clone(&self.checkpointer);
        let emitter = self.emitter.clone();
        let session = self
            .sessions
            .get_mut(thread_id)
            .ok_or_else(|| StepError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })?;

        loop {
            let current = session.next_node.clone();
            if current.is_end() {
                emitter.emit(&StreamEvent::Done { step: session.step });
                return Ok(RunOutcome::Completed {
                    state: session.state.snapshot(),
                });
            }

            // Every event of this super-step carries the step number it
            // commits as, so subscribers can pair them by (node, step).
            let step = session.step + 1;
            emitter.emit(&StreamEvent::NodeStart {
                node: current.to_string(),
                step,
            });

            // A fresh cursor over the persisted history each execution:
            // answered ordinals replay, the first unanswered one suspends.
            let cursor = InterruptCursor::new(session.interrupt_history.clone());
            let ctx = NodeContext::with_cursor(
                current.to_string(),
                session.step,
                session.config.clone(),
                cursor,
            );

            let output = match workflow
                .run_node_with_retry(&current, session.state.snapshot(), ctx)
                .await
            {
                Ok(output) => output,
                Err(NodeError::Suspended(request)) => {
                    session.pending_interrupt = Some(request.clone());
                    // State is unchanged; only the pending marker is new.
                    if let Err(err) = checkpointer.save(Checkpoint::from_session(session)).await {
                        session.pending_interrupt = None;
                        emitter.emit(&StreamEvent::Error {
                            message: err.to_string(),
                            step,
                        });
                        return Err(err.into());
                    }
                    tracing::info!(thread_id, node = %current, kind = %request.kind, "thread suspended");
                    emitter.emit(&StreamEvent::Interrupt {
                        request: request.clone(),
                    });
                    return Ok(RunOutcome::Interrupted { request });
                }
                Err(err) => {
                    emitter.emit(&StreamEvent::Error {
                        message: err.to_string(),
                        step,
                    });
                    return Err(StepError::NodeFailed {
                        node: current.to_string(),
                        source: err,
                    });
                }
            };

            // Merge into a working copy; routing sees the merged snapshot.
            let mut working = session.state.clone();
            workflow.apply_update(&mut working, &output.update)?;
            let merged = working.snapshot();
            let next = workflow.resolve_route(&current, &output.route, &merged)?;

            // Persist first, commit the session only on success.
            let candidate = Checkpoint {
                thread_id: session.thread_id.clone(),
                step,
                state: working.clone(),
                next_node: next.clone(),
                pending_interrupt: None,
                interrupt_history: Vec::new(),
                created_at: chrono::Utc::now(),
            };
            if let Err(err) = checkpointer.save(candidate).await {
                emitter.emit(&StreamEvent::Error {
                    message: err.to_string(),
                    step,
                });
                return Err(err.into());
            }

            session.state = working;
            session.next_node = next;
            session.step = step;
            session.interrupt_history.clear();

            emitter.emit(&StreamEvent::NodeEnd {
                node: current.to_string(),
                step,
            });
            let delta_messages = output.update.messages.unwrap_or_default();
            let delta_extra = output.update.extra.unwrap_or_default();
            if !delta_messages.is_empty() || !delta_extra.is_empty() {
                emitter.emit(&StreamEvent::StateDelta {
                    node: current.to_string(),
                    step,
                    messages: delta_messages,
                    extra: delta_extra,
                });
            }
        }
    }
}
