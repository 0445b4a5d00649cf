//! studytrack-store: Persistence collaborators.
//!
//! Implements the `CompletionStore` trait for the REST backend, a local
//! directory of JSON blobs, and an in-memory mock, plus the configuration
//! that picks between them.

pub mod config;
pub mod error;
pub mod file;
pub mod http;
pub mod mock;

pub use config::{create_store, load_config, ExecutorConfig, StoreConfig, StudytrackConfig};
pub use error::StoreError;
pub use file::FileStore;
pub use http::HttpStore;
pub use mock::MockStore;
