//! Local store: named JSON blobs in a directory.
//!
//! Layout:
//! - `completed-lessons.json`: `[{"lessonId": ..., "completedAt": ...}]`
//! - `problems.json`: logged problems with their completion state
//! - `progress.json`: exercise progress keyed by problem id
//! - `last-visited-lesson.json`: `{"lessonId": ...}`
//!
//! Every write replaces the whole blob through a temp file and a rename, so
//! readers never see a partial file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::instrument;

use studytrack_core::model::{
    format_timestamp, parse_timestamp, CompletionRecord, ExerciseProgress, ProblemRecord,
};
use studytrack_core::traits::CompletionStore;

use crate::error::StoreError;

pub const LESSONS_BLOB: &str = "completed-lessons.json";
pub const PROBLEMS_BLOB: &str = "problems.json";
pub const PROGRESS_BLOB: &str = "progress.json";
pub const LAST_VISITED_BLOB: &str = "last-visited-lesson.json";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLesson {
    lesson_id: String,
    completed_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredVisit {
    lesson_id: String,
}

/// Store backed by JSON files in one directory.
pub struct FileStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_blob<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, StoreError> {
        let path = self.dir.join(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        serde_json::from_str(&content).map_err(|e| StoreError::Decode {
            what: name.to_string(),
            message: e.to_string(),
        })
    }

    fn write_blob<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.display().to_string(),
            source,
        };

        let json = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Decode {
            what: name.to_string(),
            message: e.to_string(),
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(&json).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Add or replace a logged problem.
    pub async fn upsert_problem(&self, problem: ProblemRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut problems: Vec<ProblemRecord> = self.read_blob(PROBLEMS_BLOB)?;
        match problems.iter_mut().find(|p| p.id == problem.id) {
            Some(existing) => *existing = problem,
            None => problems.push(problem),
        }
        self.write_blob(PROBLEMS_BLOB, &problems)
    }

    /// Stored progress, keyed by problem id.
    pub async fn progress(&self) -> Result<BTreeMap<String, ExerciseProgress>, StoreError> {
        self.read_blob(PROGRESS_BLOB)
    }
}

#[async_trait]
impl CompletionStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(skip_all)]
    async fn completed_lessons(&self) -> anyhow::Result<Vec<CompletionRecord>> {
        let stored: Vec<StoredLesson> = self.read_blob(LESSONS_BLOB)?;
        let records = stored
            .into_iter()
            .filter_map(|s| match parse_timestamp(&s.completed_at) {
                Some(completed_at) => Some(CompletionRecord {
                    subject_id: s.lesson_id,
                    completed_at,
                }),
                None => {
                    tracing::warn!(lesson = %s.lesson_id, "stored completion has an invalid timestamp");
                    None
                }
            })
            .collect();
        Ok(records)
    }

    #[instrument(skip(self, record), fields(lesson = %record.subject_id))]
    async fn mark_lesson_complete(&self, record: &CompletionRecord) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut stored: Vec<StoredLesson> = self.read_blob(LESSONS_BLOB)?;
        if stored.iter().any(|s| s.lesson_id == record.subject_id) {
            return Ok(());
        }
        stored.push(StoredLesson {
            lesson_id: record.subject_id.clone(),
            completed_at: format_timestamp(&record.completed_at),
        });
        self.write_blob(LESSONS_BLOB, &stored)?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn problems(&self) -> anyhow::Result<Vec<ProblemRecord>> {
        Ok(self.read_blob(PROBLEMS_BLOB)?)
    }

    #[instrument(skip(self, progress), fields(problem = %progress.problem_id))]
    async fn record_progress(&self, progress: &ExerciseProgress) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut all: BTreeMap<String, ExerciseProgress> = self.read_blob(PROGRESS_BLOB)?;
        all.insert(progress.problem_id.clone(), progress.clone());
        self.write_blob(PROGRESS_BLOB, &all)?;

        // Keep the problem list's completion state in step with its progress.
        let mut problems: Vec<ProblemRecord> = self.read_blob(PROBLEMS_BLOB)?;
        if let Some(problem) = problems.iter_mut().find(|p| p.id == progress.problem_id) {
            problem.completed = progress.completed;
            problem.completed_at = progress.completed.then_some(progress.completed_at);
            self.write_blob(PROBLEMS_BLOB, &problems)?;
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn last_visited_lesson(&self) -> anyhow::Result<Option<String>> {
        let stored: Option<StoredVisit> = self.read_blob(LAST_VISITED_BLOB)?;
        Ok(stored.map(|visit| visit.lesson_id))
    }

    #[instrument(skip(self))]
    async fn set_last_visited_lesson(&self, lesson_id: &str) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let visit = StoredVisit {
            lesson_id: lesson_id.to_string(),
        };
        self.write_blob(LAST_VISITED_BLOB, &visit)?;
        Ok(())
    }
}
