//! The `studytrack grade` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use studytrack_core::grader::{GradeObserver, GradeReport};
use studytrack_core::model::{format_timestamp, Verdict};
use studytrack_core::tracker::MarkOutcome;
use studytrack_store::config::load_config_from;

use super::{ensure_saved, load_curriculum, open_session, truncate};

const VALUE_WIDTH: usize = 40;

/// Console progress reporter.
struct ConsoleReporter;

impl GradeObserver for ConsoleReporter {
    fn on_case_start(&self, ordinal: usize, total: usize) {
        eprintln!("  Running case {ordinal}/{total}");
    }

    fn on_case_complete(&self, verdict: &Verdict) {
        let status = if verdict.passed { "PASS" } else { "FAIL" };
        eprintln!("  Case {}: {status}", verdict.label);
    }

    fn on_run_complete(&self, report: &GradeReport) {
        let (passed, total) = report.summary();
        eprintln!(
            "\nComplete: {passed}/{total} passed ({}ms)",
            report.duration_ms
        );
    }
}

pub async fn execute(
    config_path: Option<PathBuf>,
    curriculum_path: Option<PathBuf>,
    lesson_id: String,
    source_path: PathBuf,
    json: bool,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let curriculum = load_curriculum(curriculum_path.as_deref(), &config)?;
    let source = std::fs::read_to_string(&source_path)
        .with_context(|| format!("failed to read source {}", source_path.display()))?;

    let mut session = open_session(&config, curriculum).await?;
    session.visit_lesson(&lesson_id).await?;

    let run = if json {
        session.run_exercise(&lesson_id, &source).await?
    } else {
        eprintln!("studytrack v{}: grading {lesson_id}", env!("CARGO_PKG_VERSION"));
        session
            .run_exercise_with(&lesson_id, &source, &ConsoleReporter)
            .await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&run.report)?);
    } else {
        print_verdicts(&run.report);
        match &run.completion {
            Some(MarkOutcome::Created(record)) => println!(
                "Lesson {lesson_id} completed at {}",
                format_timestamp(&record.completed_at)
            ),
            Some(MarkOutcome::AlreadyComplete(_)) => {
                println!("Lesson {lesson_id} was already complete.")
            }
            None => {}
        }
    }

    ensure_saved(&run.sync)?;

    let (passed, total) = run.report.summary();
    anyhow::ensure!(
        run.report.passed,
        "exercise failed: {passed}/{total} test cases passed"
    );
    Ok(())
}

fn print_verdicts(report: &GradeReport) {
    let mut table = Table::new();
    table.set_header(vec!["Case", "Input", "Expected", "Actual", "Result"]);

    for verdict in &report.verdicts {
        table.add_row(vec![
            Cell::new(verdict.label),
            Cell::new(truncate(&verdict.input.to_string(), VALUE_WIDTH)),
            Cell::new(truncate(&verdict.expected.to_string(), VALUE_WIDTH)),
            Cell::new(truncate(&verdict.actual.to_string(), VALUE_WIDTH)),
            Cell::new(if verdict.passed { "PASS" } else { "FAIL" }),
        ]);
    }

    println!("{table}");
}
