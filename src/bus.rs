//! Inter-stage message bus — an append-only log with delivery tracking.
//!
//! One bus instance per pipeline run, owned by the driver and handed to
//! each stage by reference. No process-wide singleton. Messages are
//! immutable once sent; delivery marking affects only `undelivered`
//! queries, never removes anything from the log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Mutex;

/// Default message kind.
pub const KIND_DATA: &str = "data";

/// A point-to-point message between stages.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    /// Derived from sender, recipient, and send time. Unique within a run.
    pub id: String,
    pub from: String,
    pub to: String,
    pub payload: Value,
    pub kind: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct BusInner {
    log: Vec<Envelope>,
    delivered: HashSet<String>,
}

/// Per-run message bus. Interior locking so stages can share it by
/// reference; the lock is never held across an await point.
#[derive(Debug, Default)]
pub struct MessageBus {
    inner: Mutex<BusInner>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message with the default `"data"` kind. Returns its id.
    pub fn send(&self, from: &str, to: &str, payload: Value) -> String {
        self.send_kind(from, to, payload, KIND_DATA)
    }

    /// Append a message with an explicit kind. Always succeeds — the
    /// log is unbounded and in-memory, scoped to one run.
    pub fn send_kind(&self, from: &str, to: &str, payload: Value, kind: &str) -> String {
        let sent_at = Utc::now();
        let mut inner = self.inner.lock().expect("bus lock poisoned");
        let id = format!("{from}_{to}_{}_{}", sent_at.timestamp_millis(), inner.log.len());
        inner.log.push(Envelope {
            id: id.clone(),
            from: from.into(),
            to: to.into(),
            payload,
            kind: kind.into(),
            sent_at,
        });
        id
    }

    /// Every message addressed to `recipient`, in send order, marking
    /// each as delivered.
    ///
    /// Repeated calls return the same messages again: this is a
    /// "peek all mine so far" read, not a consuming one. Only
    /// `undelivered` observes the delivery marks. Worth revisiting if
    /// stage retry is ever added, since a retried stage would reprocess
    /// everything.
    pub fn receive(&self, recipient: &str) -> Vec<Envelope> {
        let mut inner = self.inner.lock().expect("bus lock poisoned");
        let messages: Vec<Envelope> = inner
            .log
            .iter()
            .filter(|m| m.to == recipient)
            .cloned()
            .collect();
        for m in &messages {
            inner.delivered.insert(m.id.clone());
        }
        messages
    }

    /// Messages addressed to `recipient` not yet marked delivered.
    pub fn undelivered(&self, recipient: &str) -> Vec<Envelope> {
        let inner = self.inner.lock().expect("bus lock poisoned");
        inner
            .log
            .iter()
            .filter(|m| m.to == recipient && !inner.delivered.contains(&m.id))
            .cloned()
            .collect()
    }

    /// The complete message log, any recipient, in send order.
    pub fn history(&self) -> Vec<Envelope> {
        let inner = self.inner.lock().expect("bus lock poisoned");
        inner.log.clone()
    }
}
