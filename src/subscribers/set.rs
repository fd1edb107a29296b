//! # SubscriberSet: per-subscriber queues fed from the bus listener
//!
//! `emit` never awaits a subscriber, so a slow log writer cannot delay a
//! sensor poll. Each subscriber sees events in bus order; there is no ordering
//! between subscribers. A full queue drops the event for that subscriber only.
//!
//! ```text
//! emit(&Event) ──┬─► [lane "log-writer"] ─► drain ─► on_event()
//!                └─► [lane ...]          ─► drain ─► on_event()
//!                                             │ panic
//!                                             ▼
//!                                   Bus: SubscriberPanicked
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::warn;

use super::Subscribe;
use crate::events::{Bus, Event, EventKind};

/// One subscriber's queue and the task draining it.
struct Lane {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
    worker: JoinHandle<()>,
}

/// Fan-out with one bounded queue and one worker task per subscriber.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let lanes = subs
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
                Lane {
                    name: sub.name(),
                    tx,
                    worker: tokio::spawn(drain(sub, rx, bus.clone())),
                }
            })
            .collect();
        Self { lanes, bus }
    }

    /// Queues `event` for every subscriber without waiting.
    ///
    /// A full or closed queue drops the event for that subscriber and publishes
    /// `SubscriberOverflow`. Overflow events themselves are never re-reported.
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        for lane in &self.lanes {
            let Err(err) = lane.tx.try_send(Arc::clone(&event)) else {
                continue;
            };
            if event.kind == EventKind::SubscriberOverflow {
                continue;
            }
            let reason = match err {
                TrySendError::Full(_) => "full",
                TrySendError::Closed(_) => "closed",
            };
            self.bus.publish(Event::subscriber_overflow(lane.name, reason));
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Closes every queue and waits for the workers to drain them.
    pub async fn shutdown(self) {
        for Lane { tx, worker, .. } in self.lanes {
            drop(tx);
            let _ = worker.await;
        }
    }
}

async fn drain(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    let name = sub.name();
    while let Some(event) = rx.recv().await {
        let delivery = AssertUnwindSafe(sub.on_event(&event)).catch_unwind();
        if let Err(payload) = delivery.await {
            let message = panic_message(&*payload);
            warn!(subscriber = name, panic = %message, "subscriber panicked");
            bus.publish(Event::subscriber_panicked(name, message));
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait::async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.kinds.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicker;

    #[async_trait::async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    struct Blocked(Arc<Notify>);

    #[async_trait::async_trait]
    impl Subscribe for Blocked {
        async fn on_event(&self, _ev: &Event) {
            self.0.notified().await;
        }
        fn name(&self) -> &'static str {
            "blocked"
        }
        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_emit_delivers_in_order() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>], bus);
        assert!(!set.is_empty());

        set.emit(&Event::new(EventKind::Connected));
        set.emit(&Event::new(EventKind::TelemetryPublished));
        set.shutdown().await;

        assert_eq!(
            *rec.kinds.lock().unwrap(),
            vec![EventKind::Connected, EventKind::TelemetryPublished]
        );
    }

    #[tokio::test]
    async fn test_panic_is_reported_on_bus() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Panicker) as Arc<dyn Subscribe>], bus);

        set.emit(&Event::new(EventKind::Connected));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.label, Some("panicker"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
        set.shutdown().await;
    }

    #[tokio::test]
    async fn test_full_queue_reports_overflow() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let gate = Arc::new(Notify::new());
        let set = SubscriberSet::new(
            vec![Arc::new(Blocked(gate.clone())) as Arc<dyn Subscribe>],
            bus,
        );

        // The worker takes the first event and blocks; the second fills the queue.
        for _ in 0..3 {
            set.emit(&Event::new(EventKind::ReadingNotReady));
            tokio::task::yield_now().await;
        }

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberOverflow);
        assert_eq!(ev.label, Some("blocked"));
        assert_eq!(ev.reason.as_deref(), Some("full"));

        gate.notify_waiters();
        drop(set);
    }
}
