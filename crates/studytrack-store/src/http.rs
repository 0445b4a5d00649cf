//! REST store: the study tracker's backend API.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use studytrack_core::model::{
    format_timestamp, parse_timestamp, CompletionRecord, ExerciseProgress, ProblemRecord,
};
use studytrack_core::traits::CompletionStore;

use crate::error::StoreError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Store backed by the REST API.
pub struct HttpStore {
    base_url: String,
    base: Url,
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        let base_url = base.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url).with_context(|| format!("invalid base URL: {base_url}"))?;
        if parsed.cannot_be_a_base() {
            anyhow::bail!("invalid base URL: {base_url}");
        }

        Ok(Self {
            base_url,
            base: parsed,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn network_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(DEFAULT_TIMEOUT_SECS)
        } else if e.is_connect() {
            StoreError::Network(format!("backend not reachable at {}", self.base_url))
        } else {
            StoreError::Network(e.to_string())
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = request.send().await.map_err(|e| self.network_error(e))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status,
                message: error_message(&body),
            });
        }
        Ok(response)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        segments: &[&str],
    ) -> Result<T, StoreError> {
        let url = self.endpoint(segments);
        let what = url.path().to_string();
        let response = self.send(self.client.get(url)).await?;
        response.json().await.map_err(|e| StoreError::Decode {
            what,
            message: e.to_string(),
        })
    }
}

/// The `error` field of an error body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "API request failed".to_string()
            } else {
                body.trim().to_string()
            }
        })
}

#[derive(Deserialize)]
struct WireLessonCompletion {
    lesson_id: String,
    #[serde(default)]
    completed_at: Option<String>,
}

#[derive(Deserialize)]
struct WireProblem {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    /// `0`/`1`, or `null` when no progress row exists.
    #[serde(default)]
    completed: Value,
    #[serde(default)]
    completed_at: Option<String>,
    /// Set on rows that hold a lesson exercise's progress.
    #[serde(default)]
    is_lesson_exercise: Value,
}

/// Backend flags arrive as `0`/`1`, booleans or `null`.
fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}

impl From<WireProblem> for ProblemRecord {
    fn from(wire: WireProblem) -> Self {
        let completed = flag(&wire.completed);
        ProblemRecord {
            id: wire.id,
            title: wire.title,
            category: wire.category,
            difficulty: wire.difficulty,
            completed,
            completed_at: wire.completed_at.as_deref().and_then(parse_timestamp),
        }
    }
}

#[derive(Serialize)]
struct WireProgress<'a> {
    user_code: &'a str,
    completed: u8,
    completed_at: String,
}

#[async_trait]
impl CompletionStore for HttpStore {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip_all)]
    async fn completed_lessons(&self) -> anyhow::Result<Vec<CompletionRecord>> {
        let rows: Vec<WireLessonCompletion> = self.get_json(&["lessons", "completed"]).await?;
        let records = rows
            .into_iter()
            .filter_map(|row| {
                let parsed = row.completed_at.as_deref().and_then(parse_timestamp);
                if parsed.is_none() {
                    tracing::warn!(lesson = %row.lesson_id, "completion without a usable timestamp skipped");
                }
                parsed.map(|completed_at| CompletionRecord {
                    subject_id: row.lesson_id,
                    completed_at,
                })
            })
            .collect();
        Ok(records)
    }

    #[instrument(skip(self, record), fields(lesson = %record.subject_id))]
    async fn mark_lesson_complete(&self, record: &CompletionRecord) -> anyhow::Result<()> {
        let url = self.endpoint(&["lessons", "complete", record.subject_id.as_str()]);
        self.send(self.client.post(url)).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn problems(&self) -> anyhow::Result<Vec<ProblemRecord>> {
        let rows: Vec<WireProblem> = self.get_json(&["problems"]).await?;
        Ok(rows
            .into_iter()
            .filter(|row| !flag(&row.is_lesson_exercise))
            .map(ProblemRecord::from)
            .collect())
    }

    #[instrument(skip(self, progress), fields(problem = %progress.problem_id))]
    async fn record_progress(&self, progress: &ExerciseProgress) -> anyhow::Result<()> {
        let body = WireProgress {
            user_code: &progress.user_code,
            completed: u8::from(progress.completed),
            completed_at: format_timestamp(&progress.completed_at),
        };
        let url = self.endpoint(&["progress", progress.problem_id.as_str()]);
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn completed_lessons_parse_backend_rows() {
        let server = MockServer::start().await;

        let rows = serde_json::json!([
            {"id": 1, "lesson_id": "arrays-two-sum", "completed_at": "2025-03-04T10:00:00.123456"},
            {"id": 2, "lesson_id": "strings-reverse", "completed_at": "2025-03-05 08:30:00"},
            {"id": 3, "lesson_id": "broken", "completed_at": null}
        ]);
        Mock::given(method("GET"))
            .and(path("/api/lessons/completed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&rows))
            .mount(&server)
            .await;

        let store = HttpStore::new(&format!("{}/api", server.uri())).unwrap();
        let records = store.completed_lessons().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subject_id, "arrays-two-sum");
        assert_eq!(
            records[1].completed_at,
            Utc.with_ymd_and_hms(2025, 3, 5, 8, 30, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn problems_map_integer_completion() {
        let server = MockServer::start().await;

        let rows = serde_json::json!([
            {"id": "p1", "title": "Two Sum", "category": "Arrays", "difficulty": "Easy",
             "completed": 1, "completed_at": "2025-03-04T10:00:00"},
            {"id": "p2", "title": "LRU Cache", "category": "Design", "difficulty": "Medium",
             "completed": null, "completed_at": null}
        ]);
        Mock::given(method("GET"))
            .and(path("/problems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&rows))
            .mount(&server)
            .await;

        let store = HttpStore::new(&server.uri()).unwrap();
        let problems = store.problems().await.unwrap();
        assert!(problems[0].completed);
        assert!(problems[0].completion().is_some());
        assert!(!problems[1].completed);
        assert_eq!(problems[1].category.as_deref(), Some("Design"));
    }

    #[tokio::test]
    async fn problems_skip_lesson_exercise_rows() {
        let server = MockServer::start().await;

        let rows = serde_json::json!([
            {"id": "p1", "title": "Two Sum", "completed": 1, "completed_at": "2025-03-04T10:00:00",
             "is_lesson_exercise": 0},
            {"id": "arrays-two-sum-exercise", "title": "Two Sum Exercise", "lesson_id": "arrays-two-sum",
             "completed": 1, "completed_at": "2025-03-04T10:00:01", "is_lesson_exercise": 1},
            {"id": "p2", "title": "Valid Anagram", "completed": 0, "is_lesson_exercise": null}
        ]);
        Mock::given(method("GET"))
            .and(path("/problems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&rows))
            .mount(&server)
            .await;

        let store = HttpStore::new(&server.uri()).unwrap();
        let ids: Vec<String> = store.problems().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["p1", "p2"]);
    }

    #[tokio::test]
    async fn ids_are_sent_as_single_path_segments() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/lessons/complete/graphs%2Fbfs%3Fdraft"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/progress/graphs%2Fbfs%3Fdraft-exercise"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpStore::new(&format!("{}/api/", server.uri())).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap();
        store
            .mark_lesson_complete(&CompletionRecord {
                subject_id: "graphs/bfs?draft".into(),
                completed_at: at,
            })
            .await
            .unwrap();
        store
            .record_progress(&ExerciseProgress {
                problem_id: "graphs/bfs?draft-exercise".into(),
                user_code: String::new(),
                completed: true,
                completed_at: at,
            })
            .await
            .unwrap();
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(HttpStore::new("localhost:5001/api").is_err());
        assert!(HttpStore::new("not a url").is_err());
        assert_eq!(
            HttpStore::new("http://localhost:5001/api/").unwrap().base_url(),
            "http://localhost:5001/api"
        );
    }

    #[tokio::test]
    async fn mark_lesson_complete_posts_to_lesson_path() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/lessons/complete/arrays-two-sum"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message": "Lesson marked complete"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpStore::new(&server.uri()).unwrap();
        let record = CompletionRecord {
            subject_id: "arrays-two-sum".into(),
            completed_at: Utc::now(),
        };
        store.mark_lesson_complete(&record).await.unwrap();
    }

    #[tokio::test]
    async fn record_progress_sends_backend_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/progress/arrays-two-sum-exercise"))
            .and(body_json(serde_json::json!({
                "user_code": "function twoSum() {}",
                "completed": 1,
                "completed_at": "2025-03-04T10:00:00.000Z"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpStore::new(&server.uri()).unwrap();
        let progress = ExerciseProgress {
            problem_id: "arrays-two-sum-exercise".into(),
            user_code: "function twoSum() {}".into(),
            completed: true,
            completed_at: Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap(),
        };
        store.record_progress(&progress).await.unwrap();
    }

    #[tokio::test]
    async fn error_body_becomes_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/problems"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "Problem not found"})),
            )
            .mount(&server)
            .await;

        let store = HttpStore::new(&server.uri()).unwrap();
        let err = store.problems().await.unwrap_err();
        match err.downcast_ref::<StoreError>() {
            Some(StoreError::Api { status, message }) => {
                assert_eq!(*status, 404);
                assert_eq!(message, "Problem not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let store = HttpStore::new("http://127.0.0.1:9").unwrap();
        let err = store.completed_lessons().await.unwrap_err();
        assert!(err.downcast_ref::<StoreError>().is_some());
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message(r#"{"error": "nope"}"#), "nope");
        assert_eq!(error_message("plain text"), "plain text");
        assert_eq!(error_message(""), "API request failed");
    }
}
