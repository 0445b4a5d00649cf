//! Progress report with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity;
use crate::model::ActivityBucket;

/// A snapshot of study progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// When the report was created.
    pub generated_at: DateTime<Utc>,
    pub lessons_completed: usize,
    pub lessons_total: usize,
    pub problems_completed: usize,
    pub problems_total: usize,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Days in the window with at least one completion.
    pub active_days: usize,
    /// Completions inside the window.
    pub total_completions: u32,
    /// The 364-day activity window, oldest first.
    pub activity: Vec<ActivityBucket>,
}

/// Completion counts feeding a [`ProgressReport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionCounts {
    pub lessons_completed: usize,
    pub lessons_total: usize,
    pub problems_completed: usize,
    pub problems_total: usize,
}

impl ProgressReport {
    /// Derive the streak and window statistics from `activity`.
    pub fn build(counts: CompletionCounts, activity: Vec<ActivityBucket>) -> Self {
        Self {
            generated_at: Utc::now(),
            lessons_completed: counts.lessons_completed,
            lessons_total: counts.lessons_total,
            problems_completed: counts.problems_completed,
            problems_total: counts.problems_total,
            current_streak: activity::current_streak(&activity),
            longest_streak: activity::longest_streak(&activity),
            active_days: activity::active_days(&activity),
            total_completions: activity::total(&activity),
            activity,
        }
    }

    /// Fraction of curriculum lessons completed, in `0.0..=1.0`.
    pub fn lesson_completion_rate(&self) -> f64 {
        if self.lessons_total == 0 {
            return 0.0;
        }
        (self.lessons_completed as f64 / self.lessons_total as f64).min(1.0)
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ProgressReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}
