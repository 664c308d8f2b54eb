// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-local runtime event bus.
//!
//! Every append publishes to a broadcast channel. Subscribers that fall
//! behind lose the oldest events first (the channel is bounded); the
//! receiver observes the gap as a lag count and can surface it as a
//! `dropped_count` in subscription status.

use guild_core::EventEnvelope;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Bounded fanout depth per subscriber.
const BUS_CAPACITY: usize = 1024;

/// One published append.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub events_file_path: PathBuf,
    pub event: EventEnvelope,
}

#[derive(Clone)]
pub struct RuntimeEventBus {
    tx: broadcast::Sender<LogEvent>,
}

impl RuntimeEventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Subscribe to appends from now on. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.tx.subscribe()
    }

    /// Publish an append. A bus with no subscribers is fine.
    pub fn emit(&self, event: LogEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RuntimeEventBus {
    fn default() -> Self {
        Self::new()
    }
}
