//! The `studytrack complete` command.

use std::path::PathBuf;

use anyhow::Result;

use studytrack_core::model::format_timestamp;
use studytrack_core::tracker::MarkOutcome;
use studytrack_store::config::load_config_from;

use super::{ensure_saved, load_curriculum_or_empty, open_session};

pub async fn execute(
    config_path: Option<PathBuf>,
    curriculum_path: Option<PathBuf>,
    lesson: Option<String>,
    problem: Option<String>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let curriculum = load_curriculum_or_empty(curriculum_path.as_deref(), &config)?;
    let mut session = open_session(&config, curriculum).await?;

    let (kind, id, update) = match (lesson, problem) {
        (Some(id), _) => {
            let update = session.mark_lesson_complete(&id).await;
            ("Lesson", id, update)
        }
        (None, Some(id)) => {
            let update = session.mark_problem_complete(&id).await?;
            ("Problem", id, update)
        }
        (None, None) => anyhow::bail!("pass --lesson or --problem"),
    };

    match &update.outcome {
        MarkOutcome::Created(record) => println!(
            "{kind} {id} marked complete at {}",
            format_timestamp(&record.completed_at)
        ),
        MarkOutcome::AlreadyComplete(record) => println!(
            "{kind} {id} already complete since {}",
            format_timestamp(&record.completed_at)
        ),
    }

    ensure_saved(&update.sync)
}
