//! Core data model types for studytrack.
//!
//! These are the fundamental types that the entire studytrack system uses
//! to represent lessons, exercises, test cases, verdicts, and completions.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A lesson in the curriculum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// Unique identifier (e.g. "arrays-two-sum").
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Difficulty label ("Easy", "Medium", "Hard").
    #[serde(default)]
    pub difficulty: String,
    /// Category name. Filled in from the curriculum key when flattening.
    #[serde(default)]
    pub category: String,
    /// Explanatory text shown before the exercise.
    #[serde(default)]
    pub explanation: Option<String>,
    /// The coding exercise that ends this lesson.
    #[serde(default)]
    pub exercise: Option<Exercise>,
}

/// The coding challenge attached to a lesson.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    /// Optional title; falls back to the lesson title.
    #[serde(default)]
    pub title: Option<String>,
    /// What the user is asked to implement.
    #[serde(default)]
    pub prompt: String,
    /// Longer description, if any.
    #[serde(default)]
    pub description: Option<String>,
    /// Source text the editor starts with.
    #[serde(default)]
    pub starter_code: String,
    /// Reference solution.
    #[serde(default)]
    pub solution: Option<String>,
    /// Test cases, in display order.
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// One input/expected-output pair.
///
/// `input` is expected to be a JSON object whose keys are the callable's
/// parameter names in declaration order. It is kept as a raw [`Value`] so a
/// malformed definition reaches the grader instead of failing the whole
/// curriculum load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: Value,
    pub expected: Value,
}

impl TestCase {
    /// Positional arguments in the input mapping's own key order.
    ///
    /// Returns `None` when the input is not a mapping.
    pub fn arguments(&self) -> Option<Vec<Value>> {
        self.input
            .as_object()
            .map(|map| map.values().cloned().collect())
    }
}

/// Identifies which test case a verdict belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseLabel {
    /// 1-based position of the test case.
    Ordinal(usize),
    /// Sentinel for a failure outside any individual test case.
    Error,
}

impl fmt::Display for CaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseLabel::Ordinal(n) => write!(f, "{n}"),
            CaseLabel::Error => write!(f, "Error"),
        }
    }
}

impl Serialize for CaseLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CaseLabel::Ordinal(n) => serializer.serialize_u64(*n as u64),
            CaseLabel::Error => serializer.serialize_str("Error"),
        }
    }
}

impl<'de> Deserialize<'de> for CaseLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_u64()
                .filter(|n| *n >= 1)
                .map(|n| CaseLabel::Ordinal(n as usize))
                .ok_or_else(|| serde::de::Error::custom("case ordinal must be a positive integer")),
            Value::String(s) if s == "Error" => Ok(CaseLabel::Error),
            other => Err(serde::de::Error::custom(format!(
                "expected a case ordinal or \"Error\", got {other}"
            ))),
        }
    }
}

/// The transient pass/fail result for one test case after a grading run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(rename = "case")]
    pub label: CaseLabel,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub expected: Value,
    /// The returned value, or the diagnostic message when execution failed.
    pub actual: Value,
    pub passed: bool,
}

impl Verdict {
    /// The single verdict emitted when grading fails outside the per-case loop.
    pub fn sentinel(message: impl Into<String>) -> Self {
        Self {
            label: CaseLabel::Error,
            input: Value::Null,
            expected: Value::Null,
            actual: Value::String(message.into()),
            passed: false,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.label == CaseLabel::Error
    }
}

/// The durable fact that a lesson or problem has been finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    /// Lesson id or problem id.
    #[serde(alias = "lessonId", alias = "lesson_id")]
    pub subject_id: String,
    #[serde(
        alias = "completed_at",
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub completed_at: DateTime<Utc>,
}

/// A user-logged problem as returned by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProblemRecord {
    /// The completion record for this problem, if it has been completed.
    pub fn completion(&self) -> Option<CompletionRecord> {
        match (self.completed, self.completed_at) {
            (true, Some(at)) => Some(CompletionRecord {
                subject_id: self.id.clone(),
                completed_at: at,
            }),
            _ => None,
        }
    }
}

/// Progress written for a lesson exercise after a passing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProgress {
    /// `"<lessonId>-exercise"`.
    pub problem_id: String,
    pub user_code: String,
    pub completed: bool,
    #[serde(
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub completed_at: DateTime<Utc>,
}

impl ExerciseProgress {
    pub fn problem_id_for(lesson_id: &str) -> String {
        format!("{lesson_id}-exercise")
    }
}

/// One calendar day of the activity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityBucket {
    pub date: NaiveDate,
    pub count: u32,
}

/// Display intensity of a day in the heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    None,
    Low,
    Medium,
    High,
}

impl ActivityLevel {
    pub fn for_count(count: u32) -> Self {
        match count {
            0 => ActivityLevel::None,
            1 => ActivityLevel::Low,
            2 => ActivityLevel::Medium,
            _ => ActivityLevel::High,
        }
    }
}

/// Parse an ISO-8601 timestamp as exchanged with collaborators.
///
/// Accepts RFC 3339 (with offset) and the naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` form, which is read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Format a timestamp the way collaborators expect it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(ts))
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}
