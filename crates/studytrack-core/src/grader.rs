//! Exercise grader.
//!
//! Runs a candidate source against every test case of an exercise, in
//! declaration order, and turns each outcome into a [`Verdict`]. All
//! failures become data: `grade` never returns an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::compare::values_match;
use crate::error::ExecutionError;
use crate::model::{CaseLabel, Exercise, TestCase, Verdict};
use crate::traits::CodeExecutor;

/// Progress reporting trait for grading runs.
pub trait GradeObserver: Send + Sync {
    fn on_case_start(&self, ordinal: usize, total: usize);
    fn on_case_complete(&self, verdict: &Verdict);
    fn on_run_complete(&self, report: &GradeReport);
}

/// No-op observer.
pub struct NoopObserver;

impl GradeObserver for NoopObserver {
    fn on_case_start(&self, _: usize, _: usize) {}
    fn on_case_complete(&self, _: &Verdict) {}
    fn on_run_complete(&self, _: &GradeReport) {}
}

/// The outcome of one grading run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    /// Identifier for correlating log lines of this run.
    pub run_id: Uuid,
    /// One verdict per test case, or a single sentinel verdict.
    pub verdicts: Vec<Verdict>,
    /// Logical AND over all verdicts.
    pub passed: bool,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
}

impl GradeReport {
    fn new(run_id: Uuid, verdicts: Vec<Verdict>, elapsed: Duration) -> Self {
        let passed = verdicts.iter().all(|v| v.passed);
        Self {
            run_id,
            verdicts,
            passed,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// `(passed, total)` over the verdicts.
    pub fn summary(&self) -> (usize, usize) {
        let passed = self.verdicts.iter().filter(|v| v.passed).count();
        (passed, self.verdicts.len())
    }

    /// Returns `true` if the run failed outside any individual test case.
    pub fn is_internal_error(&self) -> bool {
        self.verdicts.len() == 1 && self.verdicts[0].is_sentinel()
    }
}

/// Failure outside the per-case loop.
#[derive(Debug)]
struct InternalError(String);

/// The grader.
pub struct Grader {
    executor: Arc<dyn CodeExecutor>,
}

impl Grader {
    pub fn new(executor: Arc<dyn CodeExecutor>) -> Self {
        Self { executor }
    }

    /// Name of the underlying executor.
    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }

    /// Grade `source` against every test case of `exercise`.
    pub async fn grade(&self, exercise: &Exercise, source: &str) -> GradeReport {
        self.grade_with(exercise, source, &NoopObserver).await
    }

    /// Grade with progress reporting.
    pub async fn grade_with(
        &self,
        exercise: &Exercise,
        source: &str,
        observer: &dyn GradeObserver,
    ) -> GradeReport {
        let start = Instant::now();
        let run_id = Uuid::new_v4();

        tracing::debug!(
            %run_id,
            executor = self.executor.name(),
            cases = exercise.test_cases.len(),
            source_size = source.len(),
            "grading run started"
        );

        let report = match self.run_cases(exercise, source, observer).await {
            Ok(verdicts) => GradeReport::new(run_id, verdicts, start.elapsed()),
            Err(InternalError(message)) => {
                tracing::error!(%run_id, error = %message, "grading run aborted");
                GradeReport::new(run_id, vec![Verdict::sentinel(message)], start.elapsed())
            }
        };

        let (passed, total) = report.summary();
        tracing::info!(
            %run_id,
            passed,
            total,
            all_passed = report.passed,
            duration_ms = report.duration_ms,
            "grading run finished"
        );
        observer.on_run_complete(&report);
        report
    }

    async fn run_cases(
        &self,
        exercise: &Exercise,
        source: &str,
        observer: &dyn GradeObserver,
    ) -> Result<Vec<Verdict>, InternalError> {
        let total = exercise.test_cases.len();

        // Resolve every argument list up front so a malformed definition
        // fails the run before any candidate code executes.
        let arguments = exercise
            .test_cases
            .iter()
            .enumerate()
            .map(|(idx, case)| {
                case.arguments().ok_or_else(|| {
                    InternalError(format!(
                        "test case {} input must be an object of named arguments",
                        idx + 1
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut verdicts = Vec::with_capacity(total);
        for (idx, (case, args)) in exercise.test_cases.iter().zip(arguments).enumerate() {
            let ordinal = idx + 1;
            observer.on_case_start(ordinal, total);

            let outcome = self.executor.invoke(source, &args).await;
            if let Err(err) = &outcome {
                if !err.is_candidate_failure() {
                    return Err(InternalError(err.diagnostic()));
                }
            }

            let verdict = judge(ordinal, case, outcome);
            tracing::debug!(case = ordinal, passed = verdict.passed, "test case graded");
            observer.on_case_complete(&verdict);
            verdicts.push(verdict);
        }

        Ok(verdicts)
    }
}

/// Turn one executor outcome into a verdict.
fn judge(ordinal: usize, case: &TestCase, outcome: Result<Value, ExecutionError>) -> Verdict {
    let (actual, passed) = match outcome {
        Ok(value) => {
            let passed = values_match(&value, &case.expected);
            (value, passed)
        }
        Err(err) => (Value::String(err.diagnostic()), false),
    };

    Verdict {
        label: CaseLabel::Ordinal(ordinal),
        input: case.input.clone(),
        expected: case.expected.clone(),
        actual,
        passed,
    }
}
