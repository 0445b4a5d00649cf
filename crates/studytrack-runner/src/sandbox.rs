//! Throwaway working directory for one candidate invocation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::TempDir;

use crate::harness::HARNESS_JS;

/// A temporary directory holding the harness, the candidate source, its
/// arguments and the reply marker.
///
/// On drop, the temporary directory is automatically cleaned up.
pub struct Sandbox {
    work_dir: TempDir,
}

impl Sandbox {
    /// Create a new sandbox with the harness script in place.
    pub fn new() -> Result<Self> {
        let work_dir = tempfile::Builder::new()
            .prefix("studytrack-")
            .tempdir()
            .context("failed to create temp directory")?;
        std::fs::write(work_dir.path().join("harness.js"), HARNESS_JS)
            .context("failed to write harness.js")?;
        Ok(Self { work_dir })
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn harness_path(&self) -> PathBuf {
        self.work_dir.path().join("harness.js")
    }

    pub fn source_path(&self) -> PathBuf {
        self.work_dir.path().join("candidate.js")
    }

    pub fn args_path(&self) -> PathBuf {
        self.work_dir.path().join("args.json")
    }

    /// The harness deletes this file before the candidate is compiled.
    pub fn marker_path(&self) -> PathBuf {
        self.work_dir.path().join("reply.key")
    }

    /// Write the candidate source text.
    pub fn write_source(&self, source: &str) -> Result<()> {
        std::fs::write(self.source_path(), source).context("failed to write candidate.js")
    }

    /// Write the positional argument list as a JSON array.
    pub fn write_args(&self, args: &[Value]) -> Result<()> {
        let json = serde_json::to_string(args).context("failed to encode arguments")?;
        std::fs::write(self.args_path(), json).context("failed to write args.json")
    }

    pub fn write_marker(&self, marker: &str) -> Result<()> {
        std::fs::write(self.marker_path(), marker).context("failed to write reply.key")
    }

    /// Build environment variables for the child process.
    ///
    /// Restricts access to sensitive env vars.
    pub fn build_env(&self) -> Vec<(String, String)> {
        let mut env = vec![("NODE_OPTIONS".to_string(), String::new())];

        for var in &[
            "SSH_AUTH_SOCK",
            "AWS_ACCESS_KEY_ID",
            "AWS_SECRET_ACCESS_KEY",
            "AWS_SESSION_TOKEN",
            "GITHUB_TOKEN",
            "GH_TOKEN",
            "NPM_TOKEN",
            "DOCKER_HOST",
            "DOCKER_CONFIG",
            "KUBECONFIG",
            "DATABASE_URL",
            "STUDYTRACK_API_URL",
            "STUDYTRACK_DATA_DIR",
        ] {
            env.push((var.to_string(), String::new()));
        }

        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sandbox_contains_harness() {
        let sandbox = Sandbox::new().unwrap();
        let harness = std::fs::read_to_string(sandbox.harness_path()).unwrap();
        assert!(harness.contains("new Function"));
    }

    #[test]
    fn write_source_and_args() {
        let sandbox = Sandbox::new().unwrap();
        sandbox.write_source("(a, b) => a + b").unwrap();
        sandbox.write_args(&[json!([2, 7]), json!(9)]).unwrap();

        let source = std::fs::read_to_string(sandbox.source_path()).unwrap();
        assert_eq!(source, "(a, b) => a + b");
        let args = std::fs::read_to_string(sandbox.args_path()).unwrap();
        assert_eq!(args, "[[2,7],9]");
    }

    #[test]
    fn write_marker_is_separate_from_source() {
        let sandbox = Sandbox::new().unwrap();
        sandbox.write_source("() => 1").unwrap();
        sandbox.write_marker("@@studytrack-abc@@").unwrap();

        assert_eq!(
            std::fs::read_to_string(sandbox.marker_path()).unwrap(),
            "@@studytrack-abc@@"
        );
        let source = std::fs::read_to_string(sandbox.source_path()).unwrap();
        assert!(!source.contains("@@studytrack-abc@@"));
    }

    #[test]
    fn sandboxes_are_isolated_and_cleaned_up() {
        let first = Sandbox::new().unwrap();
        let second = Sandbox::new().unwrap();
        assert_ne!(first.work_dir(), second.work_dir());

        let path = first.work_dir().to_path_buf();
        drop(first);
        assert!(!path.exists());
    }

    #[test]
    fn build_env_clears_secrets() {
        let sandbox = Sandbox::new().unwrap();
        let env = sandbox.build_env();
        assert!(env
            .iter()
            .any(|(k, v)| k == "GITHUB_TOKEN" && v.is_empty()));
    }
}
