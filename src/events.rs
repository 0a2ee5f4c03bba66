use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineEvent {
    pub line: u32,
    pub value: bool,
    pub timestamp_ms: u64,
}

/// Fans watcher callbacks out to async consumers over a broadcast channel.
#[derive(Clone)]
pub struct EventBroadcaster {
    event_tx: broadcast::Sender<LineEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);
        Self { event_tx }
    }

    pub fn dispatch(&self, event: LineEvent) {
        // no receivers is not an error
        let _ = self.event_tx.send(event);
    }

    /// Callback suitable for [`Line::listen`](crate::Line::listen).
    pub fn callback(&self, line: u32) -> impl FnMut(bool) + Send + 'static {
        let broadcaster = self.clone();
        move |value| {
            broadcaster.dispatch(LineEvent {
                line,
                value,
                timestamp_ms: epoch_millis(),
            })
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LineEvent> {
        self.event_tx.subscribe()
    }

    pub fn stream(&self) -> BroadcastStream<LineEvent> {
        BroadcastStream::new(self.subscribe())
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
