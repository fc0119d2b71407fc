use std::sync::Arc;

use futures_util::Stream;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use super::event::StreamEvent;

/// Fan-out publisher for [`StreamEvent`]s.
///
/// Cheap to clone; all clones publish to the same subscriber set.
/// Disconnected subscribers are dropped on the next publish.
#[derive(Clone, Default)]
pub struct EventEmitter {
    subscribers: Arc<Mutex<Vec<flume::Sender<StreamEvent>>>>,
}

impl EventEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber observing events from now on.
    ///
    /// Each subscriber keeps its own seen-message-id set, so dedup is
    /// per-subscriber rather than global.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        let (tx, rx) = flume::unbounded();
        self.subscribers.lock().push(tx);
        EventStream {
            rx,
            seen: FxHashSet::default(),
        }
    }

    pub(crate) fn emit(&self, event: &StreamEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// One subscriber's view of the event stream.
///
/// Delta events are filtered against the ids this subscriber has already
/// received: re-surfacing messages are removed, and a delta that becomes
/// entirely empty is skipped.
pub struct EventStream {
    rx: flume::Receiver<StreamEvent>,
    seen: FxHashSet<String>,
}

impl EventStream {
    /// Blocking receive of the next event, `None` when the emitter is gone.
    pub fn recv(&mut self) -> Option<StreamEvent> {
        loop {
            let event = self.rx.recv().ok()?;
            if let Some(event) = self.filter(event) {
                return Some(event);
            }
        }
    }

    /// Async receive of the next event, `None` when the emitter is gone.
    pub async fn recv_async(&mut self) -> Option<StreamEvent> {
        loop {
            let event = self.rx.recv_async().await.ok()?;
            if let Some(event) = self.filter(event) {
                return Some(event);
            }
        }
    }

    /// Non-blocking receive; `None` when no event is currently queued.
    pub fn try_next(&mut self) -> Option<StreamEvent> {
        loop {
            let event = self.rx.try_recv().ok()?;
            if let Some(event) = self.filter(event) {
                return Some(event);
            }
        }
    }

    /// Drains every currently queued event.
    pub fn drain(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_next() {
            events.push(event);
        }
        events
    }

    /// Converts this subscription into an async [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = StreamEvent> {
        futures_util::stream::unfold(self, |mut sub| async move {
            sub.recv_async().await.map(|event| (event, sub))
        })
    }

    fn filter(&mut self, event: StreamEvent) -> Option<StreamEvent> {
        match event {
            StreamEvent::StateDelta {
                node,
                step,
                messages,
                extra,
            } => {
                let fresh: Vec<_> = messages
                    .into_iter()
                    .filter(|m| self.seen.insert(m.id.clone()))
                    .collect();
                if fresh.is_empty() && extra.is_empty() {
                    return None;
                }
                Some(StreamEvent::StateDelta {
                    node,
                    step,
                    messages: fresh,
                    extra,
                })
            }
            other => Some(other),
        }
    }
}
