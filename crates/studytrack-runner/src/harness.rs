//! The JavaScript harness and its reply protocol.
//!
//! The harness is invoked as `node harness.js <candidate> <args> <marker>`.
//! It reads the per-invocation reply marker from the marker file and deletes
//! it, then compiles the candidate with `new Function("return " + source)()`,
//! calls the result with the decoded argument list, and prints exactly one
//! reply line prefixed with the marker. The candidate never sees the marker,
//! so nothing it prints can pass for a reply.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use studytrack_core::error::ExecutionError;

pub const HARNESS_JS: &str = r#""use strict";
const fs = require("fs");

const write = process.stdout.write.bind(process.stdout);
const stringify = JSON.stringify;
const exit = process.exit.bind(process);

const [sourcePath, argsPath, markerPath] = process.argv.slice(2);
const MARKER = fs.readFileSync(markerPath, "utf8").trim();
fs.unlinkSync(markerPath);
process.argv.splice(2);

function reply(body) {
  write("\n" + MARKER + stringify(body) + "\n");
  exit(0);
}

function messageOf(err) {
  if (err !== null && typeof err === "object" && "message" in err) {
    return String(err.message);
  }
  return String(err);
}

const source = fs.readFileSync(sourcePath, "utf8").trim();
const args = JSON.parse(fs.readFileSync(argsPath, "utf8"));

let candidate;
try {
  candidate = new Function("return " + source)();
} catch (err) {
  const status = err instanceof SyntaxError ? "compile_error" : "runtime_error";
  reply({ status, message: messageOf(err) });
}

if (typeof candidate !== "function") {
  reply({ status: "runtime_error", message: "source did not evaluate to a function" });
}

let result;
try {
  result = candidate(...args);
} catch (err) {
  reply({ status: "runtime_error", message: messageOf(err) });
}

let encoded;
try {
  encoded = stringify({ status: "ok", value: result === undefined ? null : result });
} catch (err) {
  reply({ status: "runtime_error", message: "result is not JSON-serializable: " + messageOf(err) });
}
write("\n" + MARKER + encoded + "\n");
exit(0);
"#;

/// A fresh, unguessable reply marker for one invocation.
pub fn new_marker() -> String {
    format!("@@studytrack-{}@@", Uuid::new_v4().simple())
}

/// A decoded harness reply.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Ok {
        #[serde(default)]
        value: Value,
    },
    CompileError {
        message: String,
    },
    RuntimeError {
        message: String,
    },
}

impl From<Reply> for Result<Value, ExecutionError> {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::Ok { value } => Ok(value),
            Reply::CompileError { message } => Err(ExecutionError::Compile(message)),
            Reply::RuntimeError { message } => Err(ExecutionError::Runtime(message)),
        }
    }
}

/// Reasons a harness run produced no usable reply.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("harness produced no reply")]
    MissingReply,

    #[error("malformed harness reply: {0}")]
    Malformed(String),
}

/// Find and decode the last line carrying `marker` in the harness's stdout.
pub fn parse_reply(stdout: &str, marker: &str) -> Result<Reply, ProtocolError> {
    let line = stdout
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(marker))
        .ok_or(ProtocolError::MissingReply)?;
    serde_json::from_str(line).map_err(|e| ProtocolError::Malformed(e.to_string()))
}
