//! Curriculum loading and validation.
//!
//! Curriculum content is a mapping from category name to an ordered list of
//! lessons. It can be written as JSON or TOML; both keep category and lesson
//! order, which defines previous/next navigation.

use std::collections::HashSet;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::CurriculumError;
use crate::model::Lesson;

/// Read-only lesson content, flattened in category order.
#[derive(Debug, Clone, Default)]
pub struct Curriculum {
    lessons: Vec<Lesson>,
}

/// A warning from curriculum validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The lesson ID (if applicable).
    pub lesson_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn lesson(id: &str, message: impl Into<String>) -> Self {
        Self {
            lesson_id: Some(id.to_string()),
            message: message.into(),
        }
    }
}

impl Curriculum {
    pub fn new(lessons: Vec<Lesson>) -> Self {
        Self { lessons }
    }

    /// Load a curriculum file, choosing the format by extension.
    pub fn load(path: &Path) -> Result<Self, CurriculumError> {
        let content = std::fs::read_to_string(path).map_err(|source| CurriculumError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            other => Err(CurriculumError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, CurriculumError> {
        let categories: Map<String, Value> =
            serde_json::from_str(content).map_err(|e| CurriculumError::Parse(e.to_string()))?;
        Self::from_categories(categories)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CurriculumError> {
        let categories: Map<String, Value> =
            toml::from_str(content).map_err(|e| CurriculumError::Parse(e.to_string()))?;
        Self::from_categories(categories)
    }

    fn from_categories(categories: Map<String, Value>) -> Result<Self, CurriculumError> {
        let mut lessons = Vec::new();
        for (category, entries) in categories {
            let entries: Vec<Lesson> = serde_json::from_value(entries).map_err(|e| {
                CurriculumError::Parse(format!("category {category}: {e}"))
            })?;
            lessons.extend(entries.into_iter().map(|mut lesson| {
                lesson.category = category.clone();
                lesson
            }));
        }
        tracing::debug!(lessons = lessons.len(), "curriculum loaded");
        Ok(Self { lessons })
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn lesson(&self, id: &str) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.id == id)
    }

    /// Category names in curriculum order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.lessons
            .iter()
            .map(|l| l.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// The lessons before and after `id` in curriculum order.
    pub fn neighbors(&self, id: &str) -> (Option<&Lesson>, Option<&Lesson>) {
        match self.lessons.iter().position(|l| l.id == id) {
            Some(idx) => (
                idx.checked_sub(1).and_then(|prev| self.lessons.get(prev)),
                self.lessons.get(idx + 1),
            ),
            None => (None, None),
        }
    }

    pub fn exercise_count(&self) -> usize {
        self.lessons.iter().filter(|l| l.exercise.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    /// Check the curriculum for common authoring issues.
    pub fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        let mut seen_ids = HashSet::new();
        for lesson in &self.lessons {
            if !seen_ids.insert(lesson.id.as_str()) {
                warnings.push(ValidationWarning::lesson(
                    &lesson.id,
                    format!("duplicate lesson ID: {}", lesson.id),
                ));
            }
        }

        for lesson in &self.lessons {
            let Some(exercise) = &lesson.exercise else {
                warnings.push(ValidationWarning::lesson(&lesson.id, "lesson has no exercise"));
                continue;
            };

            if exercise.test_cases.is_empty() {
                warnings.push(ValidationWarning::lesson(
                    &lesson.id,
                    "exercise has no test cases and will always pass",
                ));
            }

            for (idx, case) in exercise.test_cases.iter().enumerate() {
                if !case.input.is_object() {
                    warnings.push(ValidationWarning::lesson(
                        &lesson.id,
                        format!("test case {} input is not an object", idx + 1),
                    ));
                }
            }

            if exercise.starter_code.trim().is_empty() {
                warnings.push(ValidationWarning::lesson(&lesson.id, "starter code is empty"));
            }
        }

        warnings
    }
}
