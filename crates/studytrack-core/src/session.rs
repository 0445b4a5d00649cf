//! The study session: the owned state behind every user-facing operation.
//!
//! A [`StudySession`] holds the curriculum, the grader, the lesson and
//! problem completion trackers, and the persistence collaborator. In-memory
//! state is updated first; persistence follows and its outcome is reported
//! as a [`SyncStatus`] rather than an error.

use std::sync::Arc;

use chrono::{Local, NaiveDate, TimeZone};
use serde::Serialize;

use crate::activity::compute_activity;
use crate::curriculum::Curriculum;
use crate::error::SessionError;
use crate::grader::{GradeObserver, GradeReport, Grader, NoopObserver};
use crate::model::{ActivityBucket, Exercise, ExerciseProgress, Lesson, ProblemRecord};
use crate::report::{CompletionCounts, ProgressReport};
use crate::tracker::{Clock, CompletionTracker, MarkOutcome, SystemClock};
use crate::traits::CompletionStore;

/// Whether a completion reached the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum SyncStatus {
    /// Nothing new to persist.
    NotNeeded,
    Persisted,
    /// The collaborator rejected the write; the in-memory state is kept.
    Failed(String),
}

impl SyncStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, SyncStatus::Failed(_))
    }
}

/// Result of a `mark_*_complete` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionUpdate {
    pub outcome: MarkOutcome,
    pub sync: SyncStatus,
}

/// Result of [`StudySession::run_exercise`].
#[derive(Debug, Clone)]
pub struct ExerciseRun {
    pub report: GradeReport,
    /// Set when the run passed.
    pub completion: Option<MarkOutcome>,
    pub sync: SyncStatus,
}

pub struct StudySession {
    curriculum: Arc<Curriculum>,
    grader: Grader,
    store: Arc<dyn CompletionStore>,
    lessons: CompletionTracker,
    problems: CompletionTracker,
    problem_list: Vec<ProblemRecord>,
    last_visited: Option<String>,
}

impl StudySession {
    /// Build a session from the store's current snapshot.
    pub async fn bootstrap(
        curriculum: Arc<Curriculum>,
        grader: Grader,
        store: Arc<dyn CompletionStore>,
    ) -> Self {
        Self::bootstrap_with_clock(curriculum, grader, store, Arc::new(SystemClock)).await
    }

    /// Like [`StudySession::bootstrap`], stamping completions with `clock`.
    ///
    /// Completed lessons, problems and the last visited lesson are fetched
    /// concurrently. A failed fetch starts that part of the session empty.
    pub async fn bootstrap_with_clock(
        curriculum: Arc<Curriculum>,
        grader: Grader,
        store: Arc<dyn CompletionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (lessons, problems, last_visited) = futures::join!(
            store.completed_lessons(),
            store.problems(),
            store.last_visited_lesson()
        );

        let lessons = lessons.unwrap_or_else(|e| {
            tracing::warn!(store = store.name(), error = %e, "failed to load completed lessons");
            Vec::new()
        });
        let mut problem_list = problems.unwrap_or_else(|e| {
            tracing::warn!(store = store.name(), error = %e, "failed to load problems");
            Vec::new()
        });
        let last_visited = last_visited.unwrap_or_else(|e| {
            tracing::warn!(store = store.name(), error = %e, "failed to load last visited lesson");
            None
        });
        // Exercise progress rows are lesson completions, not logged problems.
        problem_list.retain(|problem| {
            !curriculum
                .lessons()
                .iter()
                .any(|lesson| ExerciseProgress::problem_id_for(&lesson.id) == problem.id)
        });

        tracing::info!(
            store = store.name(),
            lessons_completed = lessons.len(),
            problems = problem_list.len(),
            "study session loaded"
        );

        let problem_records = problem_list.iter().filter_map(ProblemRecord::completion);
        Self {
            lessons: CompletionTracker::from_records(lessons, Box::new(clock.clone())),
            problems: CompletionTracker::from_records(problem_records, Box::new(clock)),
            problem_list,
            last_visited,
            curriculum,
            grader,
            store,
        }
    }

    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    pub fn problems(&self) -> &[ProblemRecord] {
        &self.problem_list
    }

    pub fn lesson_tracker(&self) -> &CompletionTracker {
        &self.lessons
    }

    pub fn problem_tracker(&self) -> &CompletionTracker {
        &self.problems
    }

    /// Grade without touching completion state.
    pub async fn grade(&self, exercise: &Exercise, source: &str) -> GradeReport {
        self.grader.grade(exercise, source).await
    }

    /// Grade a lesson's exercise and record the lesson on a passing run.
    pub async fn run_exercise(
        &mut self,
        lesson_id: &str,
        source: &str,
    ) -> Result<ExerciseRun, SessionError> {
        self.run_exercise_with(lesson_id, source, &NoopObserver).await
    }

    /// [`StudySession::run_exercise`] with progress reporting.
    pub async fn run_exercise_with(
        &mut self,
        lesson_id: &str,
        source: &str,
        observer: &dyn GradeObserver,
    ) -> Result<ExerciseRun, SessionError> {
        let lesson = self
            .curriculum
            .lesson(lesson_id)
            .ok_or_else(|| SessionError::UnknownLesson(lesson_id.to_string()))?;
        let exercise = lesson
            .exercise
            .as_ref()
            .ok_or_else(|| SessionError::NoExercise(lesson_id.to_string()))?;

        let report = self.grader.grade_with(exercise, source, observer).await;
        if !report.passed {
            return Ok(ExerciseRun {
                report,
                completion: None,
                sync: SyncStatus::NotNeeded,
            });
        }

        let outcome = self.lessons.mark_complete(lesson_id);
        let sync = match &outcome {
            MarkOutcome::Created(record) => {
                let progress = ExerciseProgress {
                    problem_id: ExerciseProgress::problem_id_for(lesson_id),
                    user_code: source.to_string(),
                    completed: true,
                    completed_at: record.completed_at,
                };
                let stored = async {
                    self.store.mark_lesson_complete(record).await?;
                    self.store.record_progress(&progress).await
                };
                self.sync_result(lesson_id, stored.await)
            }
            MarkOutcome::AlreadyComplete(_) => SyncStatus::NotNeeded,
        };

        Ok(ExerciseRun {
            report,
            completion: Some(outcome),
            sync,
        })
    }

    /// Mark a lesson complete without grading.
    pub async fn mark_lesson_complete(&mut self, lesson_id: &str) -> CompletionUpdate {
        if self.curriculum.lesson(lesson_id).is_none() {
            tracing::warn!(lesson = lesson_id, "marking a lesson that is not in the curriculum");
        }
        let outcome = self.lessons.mark_complete(lesson_id);
        let sync = match &outcome {
            MarkOutcome::Created(record) => {
                let stored = self.store.mark_lesson_complete(record).await;
                self.sync_result(lesson_id, stored)
            }
            MarkOutcome::AlreadyComplete(_) => SyncStatus::NotNeeded,
        };
        CompletionUpdate { outcome, sync }
    }

    pub fn is_lesson_complete(&self, lesson_id: &str) -> bool {
        self.lessons.is_complete(lesson_id)
    }

    /// The lesson last opened, while it is still in the curriculum.
    pub fn last_visited_lesson(&self) -> Option<&Lesson> {
        self.last_visited
            .as_deref()
            .and_then(|id| self.curriculum.lesson(id))
    }

    /// Remember `lesson_id` as the lesson to pick up from.
    pub async fn visit_lesson(&mut self, lesson_id: &str) -> Result<SyncStatus, SessionError> {
        if self.curriculum.lesson(lesson_id).is_none() {
            return Err(SessionError::UnknownLesson(lesson_id.to_string()));
        }
        if self.last_visited.as_deref() == Some(lesson_id) {
            return Ok(SyncStatus::NotNeeded);
        }
        self.last_visited = Some(lesson_id.to_string());
        let stored = self.store.set_last_visited_lesson(lesson_id).await;
        Ok(self.sync_result(lesson_id, stored))
    }

    /// Mark a logged problem complete.
    pub async fn mark_problem_complete(
        &mut self,
        problem_id: &str,
    ) -> Result<CompletionUpdate, SessionError> {
        let problem = self
            .problem_list
            .iter_mut()
            .find(|p| p.id == problem_id)
            .ok_or_else(|| SessionError::UnknownProblem(problem_id.to_string()))?;

        let outcome = self.problems.mark_complete(problem_id);
        let sync = match &outcome {
            MarkOutcome::Created(record) => {
                problem.completed = true;
                problem.completed_at = Some(record.completed_at);
                let progress = ExerciseProgress {
                    problem_id: problem_id.to_string(),
                    user_code: String::new(),
                    completed: true,
                    completed_at: record.completed_at,
                };
                let stored = self.store.record_progress(&progress).await;
                self.sync_result(problem_id, stored)
            }
            MarkOutcome::AlreadyComplete(_) => SyncStatus::NotNeeded,
        };
        Ok(CompletionUpdate { outcome, sync })
    }

    pub fn is_problem_complete(&self, problem_id: &str) -> bool {
        self.problems.is_complete(problem_id)
    }

    /// Activity over all lesson and problem completions.
    pub fn activity<Tz: TimeZone>(&self, today: NaiveDate, tz: &Tz) -> Vec<ActivityBucket> {
        compute_activity(
            self.lessons.timestamps().chain(self.problems.timestamps()),
            today,
            tz,
        )
    }

    /// [`StudySession::activity`] in the system time zone, ending today.
    pub fn activity_local(&self) -> Vec<ActivityBucket> {
        self.activity(Local::now().date_naive(), &Local)
    }

    pub fn report<Tz: TimeZone>(&self, today: NaiveDate, tz: &Tz) -> ProgressReport {
        let counts = CompletionCounts {
            lessons_completed: self
                .curriculum
                .lessons()
                .iter()
                .filter(|lesson| self.lessons.is_complete(&lesson.id))
                .count(),
            lessons_total: self.curriculum.len(),
            problems_completed: self.problems.len(),
            problems_total: self.problem_list.len(),
        };
        ProgressReport::build(counts, self.activity(today, tz))
    }

    fn sync_result(&self, subject: &str, stored: anyhow::Result<()>) -> SyncStatus {
        match stored {
            Ok(()) => {
                tracing::debug!(subject, store = self.store.name(), "update persisted");
                SyncStatus::Persisted
            }
            Err(e) => {
                tracing::warn!(
                    subject,
                    store = self.store.name(),
                    error = %e,
                    "failed to persist update"
                );
                SyncStatus::Failed(format!("{e:#}"))
            }
        }
    }
}
