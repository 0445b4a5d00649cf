//! Error types shared across studytrack.
//!
//! `ExecutionError` lives in core so the grader can classify executor
//! failures (candidate failure vs. broken engine) without string matching.

use thiserror::Error;

/// Failure produced while compiling or invoking candidate code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The source failed to parse or compile.
    #[error("compile error: {0}")]
    Compile(String),

    /// The callable threw, or did not produce a representable result.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// The wall-clock bound was exceeded.
    #[error("execution timed out after {0}ms")]
    Timeout(u64),

    /// The execution engine could not be started or misbehaved.
    #[error("executor unavailable: {0}")]
    Unavailable(String),
}

impl ExecutionError {
    /// The message shown as a failing verdict's `actual` value.
    pub fn diagnostic(&self) -> String {
        match self {
            ExecutionError::Compile(msg)
            | ExecutionError::Runtime(msg)
            | ExecutionError::Unavailable(msg) => msg.clone(),
            ExecutionError::Timeout(_) => self.to_string(),
        }
    }

    /// Returns `true` if the failure is attributable to the candidate code.
    ///
    /// Anything else aborts the grading run.
    pub fn is_candidate_failure(&self) -> bool {
        !matches!(self, ExecutionError::Unavailable(_))
    }
}

/// Errors raised while loading curriculum content.
#[derive(Debug, Error)]
pub enum CurriculumError {
    #[error("failed to read curriculum {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse curriculum: {0}")]
    Parse(String),

    #[error("unsupported curriculum format: {0}")]
    UnsupportedFormat(String),
}

/// Errors from study session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown lesson: {0}")]
    UnknownLesson(String),

    #[error("lesson {0} has no exercise")]
    NoExercise(String),

    #[error("unknown problem: {0}")]
    UnknownProblem(String),
}
