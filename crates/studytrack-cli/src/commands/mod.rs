//! Subcommand implementations and the plumbing they share.

pub mod activity;
pub mod complete;
pub mod grade;
pub mod init;
pub mod lessons;
pub mod validate;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use studytrack_core::curriculum::Curriculum;
use studytrack_core::grader::Grader;
use studytrack_core::session::{StudySession, SyncStatus};
use studytrack_runner::NodeExecutor;
use studytrack_store::{create_store, StudytrackConfig};

/// Load the curriculum named on the command line, falling back to the config.
pub fn load_curriculum(path: Option<&Path>, config: &StudytrackConfig) -> Result<Curriculum> {
    match path.or(config.curriculum.as_deref()) {
        Some(path) => Curriculum::load(path)
            .with_context(|| format!("failed to load curriculum {}", path.display())),
        None => anyhow::bail!(
            "no curriculum given: pass --curriculum or set `curriculum` in studytrack.toml"
        ),
    }
}

/// Like [`load_curriculum`], but an unconfigured curriculum is empty.
pub fn load_curriculum_or_empty(
    path: Option<&Path>,
    config: &StudytrackConfig,
) -> Result<Curriculum> {
    if path.is_none() && config.curriculum.is_none() {
        return Ok(Curriculum::default());
    }
    load_curriculum(path, config)
}

/// Build a session over the configured store and executor.
pub async fn open_session(
    config: &StudytrackConfig,
    curriculum: Curriculum,
) -> Result<StudySession> {
    let executor = NodeExecutor::new()
        .with_node_binary(config.executor.node_binary.clone())
        .with_timeout(Duration::from_millis(config.executor.timeout_ms));
    let store = create_store(&config.store)?;
    let grader = Grader::new(Arc::new(executor));
    Ok(StudySession::bootstrap(Arc::new(curriculum), grader, store).await)
}

/// Turn a failed write into an error; the completion did not survive this process.
pub fn ensure_saved(sync: &SyncStatus) -> Result<()> {
    match sync {
        SyncStatus::Failed(message) => anyhow::bail!("completion was not saved: {message}"),
        SyncStatus::NotNeeded | SyncStatus::Persisted => Ok(()),
    }
}

/// Shorten `text` to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("[1,2]", 10), "[1,2]");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
    }

    #[test]
    fn missing_curriculum_is_an_error_unless_optional() {
        let config = StudytrackConfig::default();
        assert!(load_curriculum(None, &config).is_err());
        assert!(load_curriculum_or_empty(None, &config).unwrap().is_empty());
    }

    #[test]
    fn configured_curriculum_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lessons.json");
        std::fs::write(&path, r#"{"Arrays": [{"id": "a", "title": "A"}]}"#).unwrap();
        let config = StudytrackConfig {
            curriculum: Some(PathBuf::from(&path)),
            ..StudytrackConfig::default()
        };
        assert_eq!(load_curriculum(None, &config).unwrap().len(), 1);
    }

    #[test]
    fn failed_sync_is_an_error() {
        assert!(ensure_saved(&SyncStatus::Persisted).is_ok());
        assert!(ensure_saved(&SyncStatus::NotNeeded).is_ok());
        assert!(ensure_saved(&SyncStatus::Failed("down".into())).is_err());
    }
}
