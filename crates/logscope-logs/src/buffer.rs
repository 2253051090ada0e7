use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;

use logscope_types::{Classification, LogLevel, LogRecord, LogUpdate};

use crate::filter::FilterSpec;

/// Thread-safe, bounded, most-recent-first window of log records
///
/// Cloning the buffer clones a handle to the same window. Newest records
/// sit at the front; once the window is full the oldest (tail) entries are
/// evicted.
#[derive(Clone)]
pub struct RecordBuffer {
    /// Internal storage, newest record at the front
    records: Arc<RwLock<VecDeque<LogRecord>>>,

    /// Maximum window size
    capacity: usize,
}

impl RecordBuffer {
    /// Create a new buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Merge a fetched batch into the window
    ///
    /// Records whose id is already present are dropped, the survivors are
    /// prepended in their received order, and the tail is truncated back to
    /// capacity. Returns the number of records actually added.
    ///
    /// The backend has no "since" cursor and may return the identical set
    /// on every tick; repeated merges of the same batch never grow the
    /// window.
    pub fn merge_new(&self, batch: Vec<LogRecord>) -> usize {
        let mut records = self.records.write();
        let existing: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        let fresh: Vec<LogRecord> = batch
            .into_iter()
            .filter(|r| !existing.contains(r.id.as_str()))
            .collect();
        drop(existing);

        let added = fresh.len();
        for record in fresh.into_iter().rev() {
            records.push_front(record);
        }
        records.truncate(self.capacity);
        added
    }

    /// Snapshot of the window, newest first
    pub fn all(&self) -> Vec<LogRecord> {
        self.records.read().iter().cloned().collect()
    }

    /// Snapshot narrowed by a filter spec
    pub fn filtered(&self, spec: &FilterSpec) -> Vec<LogRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| spec.matches(r))
            .cloned()
            .collect()
    }

    /// Merge accepted update fields into the record with the given id
    ///
    /// Field-wise merge by id rather than wholesale replacement, so a
    /// concurrent poll cannot clobber an in-flight toggle. Returns false
    /// when the id is not in the window.
    pub fn apply_update(&self, id: &str, update: &LogUpdate) -> bool {
        let mut records = self.records.write();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        if let Some(alert) = update.alert {
            record.alert = alert;
        }
        if let Some(trigger) = update.trigger {
            record.trigger = trigger;
        }
        if let Some(classification) = update.classification {
            record.classification = Some(classification);
        }
        true
    }

    /// Remove one record by id (e.g. after a backend delete)
    pub fn remove(&self, id: &str) -> bool {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.id != id);
        records.len() != before
    }

    /// Total record count
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if the window is empty
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Configured maximum window size
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear all records
    pub fn clear(&self) {
        self.records.write().clear();
    }

    /// Record count per severity level
    pub fn level_counts(&self) -> LevelCounts {
        let records = self.records.read();
        let mut counts = LevelCounts::default();

        for record in records.iter() {
            match &record.level {
                LogLevel::Information => counts.information += 1,
                LogLevel::Warning => counts.warning += 1,
                LogLevel::Error => counts.error += 1,
                LogLevel::Critical => counts.critical += 1,
                LogLevel::Other(_) => counts.other += 1,
            }
        }

        counts
    }

    /// Record count per classification bucket
    pub fn classification_counts(&self) -> ClassificationCounts {
        let records = self.records.read();
        let mut counts = ClassificationCounts::default();

        for record in records.iter() {
            match record.classification {
                Some(Classification::Normal) => counts.normal += 1,
                Some(Classification::Suspicious) => counts.suspicious += 1,
                Some(Classification::Anomaly) => counts.anomaly += 1,
                Some(Classification::Critical) => counts.critical += 1,
                None => counts.unclassified += 1,
            }
        }

        counts
    }
}

/// Counts per severity level
#[derive(Clone, Debug, Default)]
pub struct LevelCounts {
    pub information: usize,
    pub warning: usize,
    pub error: usize,
    pub critical: usize,
    pub other: usize,
}

impl LevelCounts {
    pub fn total(&self) -> usize {
        self.information + self.warning + self.error + self.critical + self.other
    }
}

/// Counts per classification bucket
#[derive(Clone, Debug, Default)]
pub struct ClassificationCounts {
    pub normal: usize,
    pub suspicious: usize,
    pub anomaly: usize,
    pub critical: usize,
    pub unclassified: usize,
}

impl ClassificationCounts {
    pub fn total(&self) -> usize {
        self.normal + self.suspicious + self.anomaly + self.critical + self.unclassified
    }
}
