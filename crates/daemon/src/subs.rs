// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event subscriptions.
//!
//! A subscription is a filter plus an outbound channel to its
//! connection. The fanout task walks the registry for every bus event;
//! a slow connection loses oldest events first (bounded channel) and the
//! loss is visible as `dropped_count`.

use guild_core::{EventEnvelope, ProjectId, RunId, SubscriptionId};
use guild_store::LogEvent;
use guild_wire::Response;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound queue depth per connection before drop-oldest kicks in.
pub const SUBSCRIPTION_QUEUE: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub workspace_dir: Option<PathBuf>,
    pub project_id: Option<ProjectId>,
    pub run_id: Option<RunId>,
    pub event_types: Option<Vec<String>>,
}

impl SubscriptionFilter {
    /// Does an event from `events_file_path` pass this filter?
    pub fn matches(&self, events_file_path: &Path, event: &EventEnvelope) -> bool {
        if let Some(ws) = &self.workspace_dir {
            if !events_file_path.starts_with(ws) {
                return false;
            }
        }
        if let Some(project_id) = &self.project_id {
            match project_id_of(events_file_path) {
                Some(pid) if pid == project_id.as_str() => {}
                _ => return false,
            }
        }
        if let Some(run_id) = &self.run_id {
            if event.run_id != *run_id {
                return false;
            }
        }
        if let Some(types) = &self.event_types {
            if !types.iter().any(|t| t == &event.event_type) {
                return false;
            }
        }
        true
    }
}

/// Extract `<pid>` from `.../work/projects/<pid>/runs/<rid>/events.jsonl`.
pub fn project_id_of(events_file_path: &Path) -> Option<String> {
    let parts: Vec<&str> =
        events_file_path.iter().filter_map(|c| c.to_str()).collect();
    parts
        .windows(2)
        .rev()
        .find(|w| w[0] == "projects")
        .map(|w| w[1].to_string())
}

struct Subscription {
    filter: SubscriptionFilter,
    sender: mpsc::Sender<Response>,
    cursor: AtomicU64,
    dropped_count: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SubscriptionStatus {
    pub subscription_id: SubscriptionId,
    pub cursor: u64,
    pub dropped_count: u64,
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    subs: RwLock<HashMap<SubscriptionId, Arc<Subscription>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription bound to one connection's outbound queue.
    pub fn subscribe(
        &self,
        subscription_id: Option<SubscriptionId>,
        filter: SubscriptionFilter,
        sender: mpsc::Sender<Response>,
    ) -> SubscriptionId {
        let id = subscription_id.unwrap_or_else(SubscriptionId::generate);
        self.subs.write().insert(
            id,
            Arc::new(Subscription {
                filter,
                sender,
                cursor: AtomicU64::new(0),
                dropped_count: AtomicU64::new(0),
            }),
        );
        id
    }

    pub fn unsubscribe(&self, subscription_id: &SubscriptionId) -> bool {
        self.subs.write().remove(subscription_id).is_some()
    }

    pub fn ack(&self, subscription_id: &SubscriptionId, cursor: u64) -> bool {
        match self.subs.read().get(subscription_id) {
            Some(sub) => {
                sub.cursor.store(cursor, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn status(&self) -> Vec<SubscriptionStatus> {
        self.subs
            .read()
            .iter()
            .map(|(id, sub)| SubscriptionStatus {
                subscription_id: *id,
                cursor: sub.cursor.load(Ordering::SeqCst),
                dropped_count: sub.dropped_count.load(Ordering::SeqCst),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.read().is_empty()
    }

    /// Remove subscriptions whose connection is gone.
    pub fn prune_closed(&self) {
        self.subs.write().retain(|_, sub| !sub.sender.is_closed());
    }

    /// Deliver one bus event to every matching subscription.
    pub fn fanout(&self, event: &LogEvent) {
        let subs = self.subs.read();
        for (id, sub) in subs.iter() {
            if !sub.filter.matches(&event.events_file_path, &event.event) {
                continue;
            }
            let notification = notification_for(id, &event.events_file_path, &event.event);
            if sub.sender.try_send(notification).is_err() {
                // Queue full or connection gone: account the loss.
                sub.dropped_count.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Send a backfilled (indexed) event to one subscription.
    pub async fn send_backfill(
        &self,
        subscription_id: &SubscriptionId,
        project_id: &str,
        event: serde_json::Value,
    ) {
        let sub = self.subs.read().get(subscription_id).cloned();
        if let Some(sub) = sub {
            let notification = Response::notification(
                "events.notification",
                json!({
                    "subscription_id": subscription_id.as_str(),
                    "project_id": project_id,
                    "event": event,
                }),
            );
            if sub.sender.send(notification).await.is_err() {
                sub.dropped_count.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

fn notification_for(
    subscription_id: &SubscriptionId,
    events_file_path: &Path,
    event: &EventEnvelope,
) -> Response {
    Response::notification(
        "events.notification",
        json!({
            "subscription_id": subscription_id.as_str(),
            "project_id": project_id_of(events_file_path),
            "event": event,
        }),
    )
}

#[cfg(test)]
#[path = "subs_tests.rs"]
mod tests;
