//! Service event log: one human-readable line per entry, tagged with a
//! severity and a sequence id.
//!
//! The sink owns the id counter; the update loop only says what happened.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Severity of an event log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Information,
    Error,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Information => write!(f, "information"),
            EntryKind::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEntry {
    pub id: u64,
    pub kind: EntryKind,
    pub message: String,
}

/// Destination for service events. Implementations assign ids.
pub trait EventSink: Send + Sync {
    /// Record one entry and return the id assigned to it.
    fn write_entry(&self, kind: EntryKind, message: &str) -> u64;

    fn info(&self, message: &str) -> u64 {
        self.write_entry(EntryKind::Information, message)
    }

    fn error(&self, message: &str) -> u64 {
        self.write_entry(EntryKind::Error, message)
    }
}

/// Strictly increasing ids starting at 1.
#[derive(Debug)]
struct Sequence(AtomicU64);

impl Sequence {
    fn new() -> Self {
        Sequence(AtomicU64::new(1))
    }

    fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Event sink that forwards entries to `tracing` under the `glenna::events` target.
#[derive(Debug)]
pub struct EventLog {
    seq: Sequence,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            seq: Sequence::new(),
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventLog {
    fn write_entry(&self, kind: EntryKind, message: &str) -> u64 {
        let id = self.seq.next();
        match kind {
            EntryKind::Information => {
                tracing::info!(target: "glenna::events", event_id = id, kind = %kind, "{}", message)
            }
            EntryKind::Error => {
                tracing::error!(target: "glenna::events", event_id = id, kind = %kind, "{}", message)
            }
        }
        id
    }
}

/// In-memory sink. Keeps every entry; also mirrors to `tracing` at debug level.
#[derive(Debug)]
pub struct MemoryLog {
    seq: Sequence,
    entries: Mutex<Vec<EventEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self {
            seq: Sequence::new(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of all entries written so far, in id order.
    pub fn entries(&self) -> Vec<EventEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn count(&self, kind: EntryKind) -> usize {
        self.entries().iter().filter(|e| e.kind == kind).count()
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for MemoryLog {
    fn write_entry(&self, kind: EntryKind, message: &str) -> u64 {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Assign under the lock so ids and storage order agree.
        let id = self.seq.next();
        tracing::debug!(event_id = id, kind = %kind, "{}", message);
        entries.push(EventEntry {
            id,
            kind,
            message: message.to_string(),
        });
        id
    }
}
