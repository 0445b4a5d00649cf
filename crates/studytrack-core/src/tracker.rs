//! Completion tracking.
//!
//! A [`CompletionTracker`] owns the set of completion records for one kind
//! of subject (lessons or problems). Records are write-once: the first
//! `mark_complete` stamps the timestamp, later calls return the existing
//! record unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::model::CompletionRecord;

/// Source of completion timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Result of [`CompletionTracker::mark_complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// A new record was stamped.
    Created(CompletionRecord),
    /// The subject was already complete; nothing changed.
    AlreadyComplete(CompletionRecord),
}

impl MarkOutcome {
    pub fn record(&self) -> &CompletionRecord {
        match self {
            MarkOutcome::Created(r) | MarkOutcome::AlreadyComplete(r) => r,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, MarkOutcome::Created(_))
    }
}

/// At most one completion record per subject id.
pub struct CompletionTracker {
    records: HashMap<String, CompletionRecord>,
    clock: Box<dyn Clock>,
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompletionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionTracker")
            .field("records", &self.records.len())
            .finish()
    }
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            records: HashMap::new(),
            clock,
        }
    }

    /// Build a tracker from a persistence snapshot.
    ///
    /// When the snapshot holds several records for one subject, the first
    /// one wins.
    pub fn from_records(
        records: impl IntoIterator<Item = CompletionRecord>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let mut tracker = Self::with_clock(clock);
        for record in records {
            if tracker.records.contains_key(&record.subject_id) {
                tracing::debug!(subject = %record.subject_id, "duplicate completion record ignored");
                continue;
            }
            tracker.records.insert(record.subject_id.clone(), record);
        }
        tracker
    }

    /// Record `subject_id` as completed now, unless it already is.
    pub fn mark_complete(&mut self, subject_id: &str) -> MarkOutcome {
        if let Some(existing) = self.records.get(subject_id) {
            return MarkOutcome::AlreadyComplete(existing.clone());
        }
        let record = CompletionRecord {
            subject_id: subject_id.to_string(),
            completed_at: self.clock.now(),
        };
        self.records.insert(subject_id.to_string(), record.clone());
        tracing::debug!(subject = %subject_id, "completion recorded");
        MarkOutcome::Created(record)
    }

    pub fn is_complete(&self, subject_id: &str) -> bool {
        self.records.contains_key(subject_id)
    }

    pub fn get(&self, subject_id: &str) -> Option<&CompletionRecord> {
        self.records.get(subject_id)
    }

    /// Remove a subject's record. Only for explicit item deletion.
    pub fn forget(&mut self, subject_id: &str) -> Option<CompletionRecord> {
        self.records.remove(subject_id)
    }

    /// All records, ordered by completion time then id.
    pub fn all(&self) -> Vec<CompletionRecord> {
        let mut records: Vec<CompletionRecord> = self.records.values().cloned().collect();
        records.sort_by(|a, b| {
            a.completed_at
                .cmp(&b.completed_at)
                .then_with(|| a.subject_id.cmp(&b.subject_id))
        });
        records
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.records.values().map(|r| r.completed_at)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
