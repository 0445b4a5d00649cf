//! Core trait definitions for code executors and persistence collaborators.
//!
//! These async traits are implemented by the `studytrack-runner` and
//! `studytrack-store` crates respectively.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ExecutionError;
use crate::model::{CompletionRecord, ExerciseProgress, ProblemRecord};

// ---------------------------------------------------------------------------
// Code executor trait
// ---------------------------------------------------------------------------

/// Loads an untrusted callable from source text and invokes it.
///
/// Implementations must contain every failure of the candidate code and
/// report it as an [`ExecutionError`]; a bad candidate never panics the
/// caller. Each call compiles `source` afresh, so no state is shared
/// between invocations.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Short engine name (e.g. "node").
    fn name(&self) -> &str;

    /// Compile `source` into a callable and invoke it with `args`.
    async fn invoke(&self, source: &str, args: &[Value]) -> Result<Value, ExecutionError>;
}

// ---------------------------------------------------------------------------
// Persistence collaborator trait
// ---------------------------------------------------------------------------

/// The storage/API backend that holds completion state.
///
/// In-memory state is always updated before these calls; an `Err` means the
/// update is not durable.
#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// Human-readable store name (e.g. "http").
    fn name(&self) -> &str;

    /// All completed lessons known to the backend.
    async fn completed_lessons(&self) -> anyhow::Result<Vec<CompletionRecord>>;

    /// Record a lesson completion. Must be a no-op if already recorded.
    async fn mark_lesson_complete(&self, record: &CompletionRecord) -> anyhow::Result<()>;

    /// All user-logged problems, with their completion state.
    async fn problems(&self) -> anyhow::Result<Vec<ProblemRecord>>;

    /// Record progress on a problem or lesson exercise.
    async fn record_progress(&self, progress: &ExerciseProgress) -> anyhow::Result<()>;

    /// The lesson the user last opened. Stores without a place for it
    /// report `None`.
    async fn last_visited_lesson(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    /// Remember the lesson the user last opened.
    async fn set_last_visited_lesson(&self, _lesson_id: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
