//! Audit log
//!
//! The audit log is the append-only trace of a run. Entries are never
//! mutated or reordered once appended. Every entry is forwarded to an
//! `AuditSink` at emission time, in append order.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::Record;

/// One timestamped trace entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub stage: String,
    pub message: String,
    /// Optional structured fields, flattened into the entry when serialized
    #[serde(flatten)]
    pub extra: Record,
}

impl AuditEntry {
    /// Look up an extra field
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.stage,
            self.message
        )
    }
}

// ============================================================================
// AuditSink - receives entries as they are emitted
// ============================================================================

/// Receiver of audit entries at emission time
///
/// Sinks are fire-and-forget: they cannot fail the run. Implementations can:
/// - Write to the console or a tracing subscriber
/// - Collect entries in memory for testing
/// - Do nothing
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Sink that emits one `tracing` event per entry
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::info!(target: "stagerun::audit", stage = %entry.stage, "{}", entry);
    }
}

/// Sink that discards entries
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl AuditSink for NoopSink {
    fn record(&self, _entry: &AuditEntry) {}
}

/// Sink that keeps a copy of every entry in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries received so far
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl AuditSink for MemorySink {
    fn record(&self, entry: &AuditEntry) {
        self.entries.lock().push(entry.clone());
    }
}

// ============================================================================
// AuditLog
// ============================================================================

/// Append-only, ordered audit log owned by one run
pub struct AuditLog {
    entries: Vec<AuditEntry>,
    sink: Arc<dyn AuditSink>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(Arc::new(NoopSink))
    }
}

impl AuditLog {
    /// Create an empty log forwarding to `sink`
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            entries: Vec::new(),
            sink,
        }
    }

    /// Append an entry stamped with the current time
    ///
    /// The timestamp never goes backwards relative to the previous entry,
    /// even if the wall clock does.
    pub fn append(
        &mut self,
        stage: impl Into<String>,
        message: impl Into<String>,
        extra: Record,
    ) -> &AuditEntry {
        let now = Utc::now();
        let timestamp = match self.entries.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        let entry = AuditEntry {
            timestamp,
            stage: stage.into(),
            message: message.into(),
            extra,
        };
        self.sink.record(&entry);
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one stage, in append order
    pub fn for_stage<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a AuditEntry> + 'a {
        self.entries.iter().filter(move |e| e.stage == stage)
    }

    /// Messages of all entries, in append order
    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn into_entries(self) -> Vec<AuditEntry> {
        self.entries
    }
}

impl fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLog")
            .field("entries", &self.entries.len())
            .finish()
    }
}
