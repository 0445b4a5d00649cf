//! studytrack-runner: Process-isolated JavaScript execution.
//!
//! Every invocation gets a fresh sandbox directory and a fresh `node`
//! process, so no state survives between test cases.

pub mod harness;
pub mod sandbox;

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use studytrack_core::error::ExecutionError;
use studytrack_core::traits::CodeExecutor;

use crate::harness::{new_marker, parse_reply, ProtocolError};
use crate::sandbox::Sandbox;

/// Default wall-clock bound per invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Code executor that runs candidate JavaScript under `node`.
#[derive(Debug, Clone)]
pub struct NodeExecutor {
    node_binary: PathBuf,
    /// `None` disables the bound.
    timeout: Option<Duration>,
}

impl Default for NodeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeExecutor {
    pub fn new() -> Self {
        Self {
            node_binary: PathBuf::from("node"),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Set the wall-clock bound. A zero duration disables it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn with_node_binary(mut self, node_binary: impl Into<PathBuf>) -> Self {
        self.node_binary = node_binary.into();
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The engine's version string, or `None` if it cannot be started.
    pub async fn version(&self) -> Option<String> {
        let output = Command::new(&self.node_binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, sandbox: &Sandbox, marker: &str) -> Result<Value, ExecutionError> {
        let mut cmd = Command::new(&self.node_binary);
        cmd.arg(sandbox.harness_path())
            .arg(sandbox.source_path())
            .arg(sandbox.args_path())
            .arg(sandbox.marker_path())
            .current_dir(sandbox.work_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, val) in sandbox.build_env() {
            cmd.env(&key, &val);
        }

        let child = cmd.spawn().map_err(|e| {
            ExecutionError::Unavailable(format!(
                "failed to start {}: {e}",
                self.node_binary.display()
            ))
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ExecutionError::Timeout(limit.as_millis() as u64))?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| ExecutionError::Unavailable(format!("failed to wait for node: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_reply(&stdout, marker) {
            Ok(reply) => reply.into(),
            Err(ProtocolError::MissingReply) => {
                // The candidate ended the process before the harness could answer.
                let stderr = String::from_utf8_lossy(&output.stderr);
                let detail = stderr
                    .lines()
                    .rev()
                    .find(|line| !line.trim().is_empty())
                    .map(|line| line.trim().to_string())
                    .unwrap_or_else(|| format!("process exited with {}", output.status));
                Err(ExecutionError::Runtime(detail))
            }
            Err(e @ ProtocolError::Malformed(_)) => Err(ExecutionError::Runtime(e.to_string())),
        }
    }
}

#[async_trait]
impl CodeExecutor for NodeExecutor {
    fn name(&self) -> &str {
        "node"
    }

    #[tracing::instrument(skip_all, fields(args = args.len()))]
    async fn invoke(&self, source: &str, args: &[Value]) -> Result<Value, ExecutionError> {
        let start = Instant::now();
        let marker = new_marker();

        let sandbox = Sandbox::new()
            .and_then(|sandbox| {
                sandbox.write_source(source)?;
                sandbox.write_args(args)?;
                sandbox.write_marker(&marker)?;
                Ok(sandbox)
            })
            .map_err(|e| ExecutionError::Unavailable(format!("{e:#}")))?;

        let result = self.run(&sandbox, &marker).await;
        tracing::debug!(
            ok = result.is_ok(),
            duration_ms = start.elapsed().as_millis() as u64,
            "node invocation finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node_available() -> bool {
        std::process::Command::new("node")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    macro_rules! require_node {
        () => {
            if !node_available() {
                eprintln!("skipping: node is not installed");
                return;
            }
        };
    }

    const TWO_SUM: &str = r#"function twoSum(nums, target) {
  const seen = new Map();
  for (let i = 0; i < nums.length; i++) {
    const need = target - nums[i];
    if (seen.has(need)) return [seen.get(need), i];
    seen.set(nums[i], i);
  }
  return [];
}"#;

    #[test]
    fn zero_timeout_disables_bound() {
        let executor = NodeExecutor::new().with_timeout(Duration::ZERO);
        assert_eq!(executor.timeout(), None);
        let executor = NodeExecutor::new().with_timeout(Duration::from_millis(250));
        assert_eq!(executor.timeout(), Some(Duration::from_millis(250)));
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let executor = NodeExecutor::new().with_node_binary("/nonexistent/studytrack-node");
        let err = executor.invoke("() => 1", &[]).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Unavailable(_)));
        assert!(executor.version().await.is_none());
    }

    #[tokio::test]
    async fn invokes_function_declaration() {
        require_node!();
        let executor = NodeExecutor::new();
        let value = executor
            .invoke(TWO_SUM, &[json!([2, 7, 11, 15]), json!(9)])
            .await
            .unwrap();
        assert_eq!(value, json!([0, 1]));
    }

    #[tokio::test]
    async fn invokes_arrow_function_and_ignores_console_output() {
        require_node!();
        let source = "(a, b) => { console.log('adding'); return { sum: a + b }; }";
        let value = NodeExecutor::new()
            .invoke(source, &[json!(2), json!(3)])
            .await
            .unwrap();
        assert_eq!(value, json!({"sum": 5}));
    }

    #[tokio::test]
    async fn syntax_error_is_compile_error() {
        require_node!();
        let err = NodeExecutor::new()
            .invoke("function (nums {", &[json!(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Compile(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn thrown_error_is_runtime_error() {
        require_node!();
        let err = NodeExecutor::new()
            .invoke("function f() { throw new Error('boom'); }", &[])
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::Runtime("boom".into()));
    }

    #[tokio::test]
    async fn non_function_source_is_runtime_error() {
        require_node!();
        let err = NodeExecutor::new().invoke("42", &[]).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Runtime(_)));
    }

    #[tokio::test]
    async fn undefined_result_is_null() {
        require_node!();
        let value = NodeExecutor::new().invoke("function f() {}", &[]).await.unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn infinite_loop_times_out() {
        require_node!();
        let executor = NodeExecutor::new().with_timeout(Duration::from_millis(500));
        let err = executor
            .invoke("function f() { while (true) {} }", &[])
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::Timeout(500));
    }

    #[tokio::test]
    async fn state_does_not_leak_between_invocations() {
        require_node!();
        let source = "function f() { globalThis.count = (globalThis.count || 0) + 1; return globalThis.count; }";
        let executor = NodeExecutor::new();
        assert_eq!(executor.invoke(source, &[]).await.unwrap(), json!(1));
        assert_eq!(executor.invoke(source, &[]).await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn forged_reply_line_does_not_abort_the_run() {
        require_node!();
        let source = r#"function f() {
  console.log("@@studytrack-reply@@{not json");
  process.exit(0);
}"#;
        let err = NodeExecutor::new().invoke(source, &[]).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Runtime(_)), "got {err:?}");
        assert!(err.is_candidate_failure());
    }

    #[tokio::test]
    async fn forged_ok_reply_is_not_accepted() {
        require_node!();
        let source = r#"function f() {
  process.stdout.write('\n@@studytrack-reply@@{"status":"ok","value":[0,1]}\n');
  process.exit(0);
}"#;
        let result = NodeExecutor::new().invoke(source, &[]).await;
        assert!(result.is_err(), "got {result:?}");
    }

    #[tokio::test]
    async fn marker_file_is_gone_and_argv_scrubbed() {
        require_node!();
        let source = r#"function f() {
  const fs = process.mainModule.require("fs");
  return { argv: process.argv.length, keys: fs.readdirSync(".").filter((f) => f.endsWith(".key")) };
}"#;
        let value = NodeExecutor::new().invoke(source, &[]).await.unwrap();
        assert_eq!(value, json!({"argv": 2, "keys": []}));
    }
}
