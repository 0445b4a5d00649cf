//! studytrack-core: Exercise grading, completion tracking, and activity
//! aggregation.
//!
//! This crate defines the data model, the executor and store traits, the
//! grader, and the progress views that the rest of studytrack builds on.

pub mod activity;
pub mod compare;
pub mod curriculum;
pub mod error;
pub mod grader;
pub mod model;
pub mod report;
pub mod session;
pub mod tracker;
pub mod traits;
