//! The `studytrack activity` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use comfy_table::{Cell, Table};

use studytrack_core::activity::weeks;
use studytrack_core::model::{ActivityBucket, ActivityLevel};
use studytrack_core::report::ProgressReport;
use studytrack_store::config::load_config_from;

use super::{load_curriculum_or_empty, open_session};

pub async fn execute(
    config_path: Option<PathBuf>,
    curriculum_path: Option<PathBuf>,
    json: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let curriculum = load_curriculum_or_empty(curriculum_path.as_deref(), &config)?;
    let session = open_session(&config, curriculum).await?;

    let report = session.report(Local::now().date_naive(), &Local);

    if let Some(path) = &output {
        report.save_json(path)?;
        eprintln!("Report saved to: {}", path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
        println!();
        print_heatmap(&report.activity);
    }

    Ok(())
}

fn print_summary(report: &ProgressReport) {
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);

    let rows = [
        (
            "Lessons completed",
            format!(
                "{}/{} ({:.1}%)",
                report.lessons_completed,
                report.lessons_total,
                report.lesson_completion_rate() * 100.0
            ),
        ),
        (
            "Problems completed",
            format!("{}/{}", report.problems_completed, report.problems_total),
        ),
        ("Current streak", days(report.current_streak)),
        ("Longest streak", days(report.longest_streak)),
        ("Active days", report.active_days.to_string()),
        ("Completions (52 weeks)", report.total_completions.to_string()),
    ];
    for (metric, value) in rows {
        table.add_row(vec![Cell::new(metric), Cell::new(value)]);
    }

    println!("{table}");
}

fn days(n: u32) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{n} days")
    }
}

fn glyph(level: ActivityLevel) -> char {
    match level {
        ActivityLevel::None => '.',
        ActivityLevel::Low => '░',
        ActivityLevel::Medium => '▒',
        ActivityLevel::High => '█',
    }
}

/// One row per day of the week, one column per week, oldest on the left.
fn print_heatmap(buckets: &[ActivityBucket]) {
    let columns = weeks(buckets);
    let Some(first) = columns.first() else {
        return;
    };

    for (row, day) in first.iter().enumerate() {
        let cells: String = columns
            .iter()
            .filter_map(|week| week.get(row))
            .map(|bucket| glyph(ActivityLevel::for_count(bucket.count)))
            .collect();
        println!("{} {cells}", day.date.format("%a"));
    }
    println!("    less . ░ ▒ █ more");
}
