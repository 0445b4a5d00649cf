//! The `studytrack validate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use studytrack_core::curriculum::Curriculum;

pub fn execute(curriculum_path: PathBuf) -> Result<()> {
    let curriculum = Curriculum::load(&curriculum_path)
        .with_context(|| format!("failed to load curriculum {}", curriculum_path.display()))?;

    println!(
        "Curriculum: {} lessons in {} categories ({} exercises)",
        curriculum.len(),
        curriculum.categories().len(),
        curriculum.exercise_count()
    );

    let warnings = curriculum.validate();
    for w in &warnings {
        let prefix = w
            .lesson_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Curriculum valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
