//! Batching of lifecycle events
//!
//! Bursts of notifications (an editor saving several files, a `git checkout`)
//! become one batch: the batch closes once the stream has been quiet for the
//! debounce delay or the batch is full.

use crate::event::Event;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// Quiet period that closes a batch
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Largest batch handed out at once
pub const DEFAULT_MAX_BATCH: usize = 256;

/// Collects events from a channel into debounced batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCoalescer {
    delay: Duration,
    max_batch: usize,
}

impl Default for EventCoalescer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE, DEFAULT_MAX_BATCH)
    }
}

impl EventCoalescer {
    pub fn new(delay: Duration, max_batch: usize) -> Self {
        Self {
            delay,
            max_batch: max_batch.max(1),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    /// Block for the next batch.
    ///
    /// Waits without limit for the first event, then keeps collecting until
    /// `delay` passes with nothing new. Returns `None` once every sender is
    /// gone and nothing is pending.
    pub fn next_batch(&self, rx: &Receiver<Event>) -> Option<Vec<Event>> {
        let first = rx.recv().ok()?;
        let mut batch = vec![first];

        while batch.len() < self.max_batch {
            match rx.recv_timeout(self.delay) {
                Ok(event) => batch.push(event),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        Some(dedup_consecutive(batch))
    }
}

/// Drop events repeating the kind and watch path of the one just before
pub fn dedup_consecutive(mut events: Vec<Event>) -> Vec<Event> {
    events.dedup_by(|next, prev| next.kind == prev.kind && next.watch_path() == prev.watch_path());
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::package::{Package, SourceLayout};
    use pretty_assertions::assert_eq;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind, Package::new(SourceLayout::new("/ws/src", "pkg"), path))
    }

    fn summary(events: &[Event]) -> Vec<(EventKind, String)> {
        events
            .iter()
            .map(|e| (e.kind, e.watch_path().display().to_string()))
            .collect()
    }

    #[test]
    fn test_dedup_consecutive_only() {
        let events = vec![
            event(EventKind::Update, "/ws/src/a"),
            event(EventKind::Update, "/ws/src/a"),
            event(EventKind::Update, "/ws/src/b"),
            event(EventKind::Update, "/ws/src/a"),
            event(EventKind::Delete, "/ws/src/a"),
        ];
        assert_eq!(
            summary(&dedup_consecutive(events)),
            vec![
                (EventKind::Update, "/ws/src/a".to_string()),
                (EventKind::Update, "/ws/src/b".to_string()),
                (EventKind::Update, "/ws/src/a".to_string()),
                (EventKind::Delete, "/ws/src/a".to_string()),
            ]
        );
    }

    #[test]
    fn test_burst_becomes_one_batch() {
        let (tx, rx) = mpsc::channel();
        for _ in 0..3 {
            tx.send(event(EventKind::Update, "/ws/src/a")).unwrap();
        }
        tx.send(event(EventKind::Update, "/ws/src/b")).unwrap();

        let coalescer = EventCoalescer::new(Duration::from_millis(20), 16);
        let batch = coalescer.next_batch(&rx).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_max_batch_closes_early() {
        let (tx, rx) = mpsc::channel();
        for path in ["/ws/src/a", "/ws/src/b", "/ws/src/c"] {
            tx.send(event(EventKind::Update, path)).unwrap();
        }

        let coalescer = EventCoalescer::new(Duration::from_secs(30), 2);
        let started = Instant::now();
        let batch = coalescer.next_batch(&rx).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(coalescer.next_batch(&rx).unwrap().len(), 1);
    }

    #[test]
    fn test_late_event_extends_batch() {
        let (tx, rx) = mpsc::channel();
        let sender = thread::spawn(move || {
            tx.send(event(EventKind::Update, "/ws/src/a")).unwrap();
            thread::sleep(Duration::from_millis(30));
            tx.send(event(EventKind::Update, "/ws/src/b")).unwrap();
        });

        let coalescer = EventCoalescer::new(Duration::from_millis(500), 16);
        let batch = coalescer.next_batch(&rx).unwrap();
        sender.join().unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_disconnected_returns_none() {
        let (tx, rx) = mpsc::channel::<Event>();
        drop(tx);
        assert!(EventCoalescer::default().next_batch(&rx).is_none());
    }

    #[test]
    fn test_pending_events_flushed_after_disconnect() {
        let (tx, rx) = mpsc::channel();
        tx.send(event(EventKind::Delete, "/ws/src/a")).unwrap();
        drop(tx);
        let batch = EventCoalescer::default().next_batch(&rx).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(EventCoalescer::default().next_batch(&rx).is_none());
    }
}
