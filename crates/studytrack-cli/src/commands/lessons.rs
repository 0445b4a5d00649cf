//! The `studytrack lessons` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use studytrack_core::session::StudySession;
use studytrack_store::config::load_config_from;

use super::{load_curriculum, open_session};

pub async fn execute(config_path: Option<PathBuf>, curriculum_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let curriculum = load_curriculum(curriculum_path.as_deref(), &config)?;
    let session = open_session(&config, curriculum).await?;

    print_lessons(&session);
    Ok(())
}

fn print_lessons(session: &StudySession) {
    let mut table = Table::new();
    table.set_header(vec!["Lesson", "Title", "Category", "Difficulty", "Tests", "Completed"]);

    let curriculum = session.curriculum();
    for lesson in curriculum.lessons() {
        let tests = lesson
            .exercise
            .as_ref()
            .map(|e| e.test_cases.len().to_string())
            .unwrap_or_else(|| "-".to_string());
        let completed = session
            .lesson_tracker()
            .get(&lesson.id)
            .map(|r| r.completed_at.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(&lesson.id),
            Cell::new(&lesson.title),
            Cell::new(&lesson.category),
            Cell::new(&lesson.difficulty),
            Cell::new(tests),
            Cell::new(completed),
        ]);
    }

    println!("{table}");

    let done = curriculum
        .lessons()
        .iter()
        .filter(|l| session.is_lesson_complete(&l.id))
        .count();
    println!("\n{done}/{} lessons complete.", curriculum.len());

    if let Some(lesson) = session.last_visited_lesson() {
        println!(
            "Pick up where you left off: {} ({}, {} {})",
            lesson.title, lesson.id, lesson.difficulty, lesson.category
        );
    }
}
