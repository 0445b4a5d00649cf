//! Mock store for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use studytrack_core::model::{CompletionRecord, ExerciseProgress, ProblemRecord};
use studytrack_core::traits::CompletionStore;

use crate::error::StoreError;

/// An in-memory store for exercising the session without a backend.
///
/// Counts calls and can be switched into a failing mode.
#[derive(Default)]
pub struct MockStore {
    lessons: Mutex<Vec<CompletionRecord>>,
    problems: Mutex<Vec<ProblemRecord>>,
    progress: Mutex<Vec<ExerciseProgress>>,
    last_visited: Mutex<Option<String>>,
    fail: AtomicBool,
    read_count: AtomicU32,
    write_count: AtomicU32,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock pre-loaded with a snapshot.
    pub fn with_snapshot(lessons: Vec<CompletionRecord>, problems: Vec<ProblemRecord>) -> Self {
        Self {
            lessons: Mutex::new(lessons),
            problems: Mutex::new(problems),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Relaxed)
    }

    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Progress writes received, in order.
    pub fn recorded_progress(&self) -> Vec<ExerciseProgress> {
        lock(&self.progress).clone()
    }

    fn check(&self, op: &str) -> Result<(), StoreError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(StoreError::Injected(op.to_string()));
        }
        Ok(())
    }
}

/// Lock, recovering the data from a poisoned mutex.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CompletionStore for MockStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn completed_lessons(&self) -> anyhow::Result<Vec<CompletionRecord>> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        self.check("completed_lessons")?;
        Ok(lock(&self.lessons).clone())
    }

    async fn mark_lesson_complete(&self, record: &CompletionRecord) -> anyhow::Result<()> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.check("mark_lesson_complete")?;
        let mut lessons = lock(&self.lessons);
        if !lessons.iter().any(|r| r.subject_id == record.subject_id) {
            lessons.push(record.clone());
        }
        Ok(())
    }

    async fn problems(&self) -> anyhow::Result<Vec<ProblemRecord>> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        self.check("problems")?;
        Ok(lock(&self.problems).clone())
    }

    async fn record_progress(&self, progress: &ExerciseProgress) -> anyhow::Result<()> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.check("record_progress")?;
        lock(&self.progress).push(progress.clone());
        Ok(())
    }

    async fn last_visited_lesson(&self) -> anyhow::Result<Option<String>> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        self.check("last_visited_lesson")?;
        Ok(lock(&self.last_visited).clone())
    }

    async fn set_last_visited_lesson(&self, lesson_id: &str) -> anyhow::Result<()> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.check("set_last_visited_lesson")?;
        *lock(&self.last_visited) = Some(lesson_id.to_string());
        Ok(())
    }
}
