//! Incremental streaming of execution progress.
//!
//! The stepper publishes [`StreamEvent`]s through an [`EventEmitter`] as it
//! drives a thread: node boundaries, merged state deltas, interrupts, and
//! terminal outcomes. Each [`subscribe`](EventEmitter::subscribe) call yields
//! an independent [`EventStream`] that observes events from subscription time
//! onward (streams are restartable, not replayable) and filters re-surfacing
//! messages out of deltas so every message id is delivered at most once per
//! subscriber.

mod emitter;
mod event;

pub use emitter::{EventEmitter, EventStream};
pub use event::StreamEvent;
