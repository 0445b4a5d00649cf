//! studytrack configuration and store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use studytrack_core::traits::CompletionStore;

use crate::file::FileStore;
use crate::http::{HttpStore, DEFAULT_BASE_URL};
use crate::mock::MockStore;

/// Where completion state lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    Http {
        #[serde(default = "default_base_url")]
        base_url: String,
    },
    File {
        #[serde(default = "default_data_dir")]
        dir: PathBuf,
    },
    /// In-memory, lost on exit.
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            dir: default_data_dir(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".studytrack")
}

/// How candidate code is executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_node_binary")]
    pub node_binary: String,
    /// Wall-clock bound per invocation; `0` disables it.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            node_binary: default_node_binary(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_node_binary() -> String {
    "node".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

/// Top-level studytrack configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudytrackConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Default curriculum file.
    #[serde(default)]
    pub curriculum: Option<PathBuf>,
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
pub fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

impl StudytrackConfig {
    /// Resolve `${VAR}` references in every string setting.
    fn resolved(mut self) -> Self {
        self.store = match self.store {
            StoreConfig::Http { base_url } => StoreConfig::Http {
                base_url: resolve_env_vars(&base_url),
            },
            StoreConfig::File { dir } => StoreConfig::File {
                dir: resolve_path(&dir),
            },
            StoreConfig::Memory => StoreConfig::Memory,
        };
        self.executor.node_binary = resolve_env_vars(&self.executor.node_binary);
        self.curriculum = self.curriculum.as_deref().map(resolve_path);
        self
    }

    /// Apply `STUDYTRACK_API_URL` and `STUDYTRACK_DATA_DIR`.
    ///
    /// The data directory wins when both are set.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("STUDYTRACK_API_URL").filter(|v| !v.is_empty()) {
            self.store = StoreConfig::Http { base_url: url };
        }
        if let Some(dir) = lookup("STUDYTRACK_DATA_DIR").filter(|v| !v.is_empty()) {
            self.store = StoreConfig::File {
                dir: PathBuf::from(dir),
            };
        }
        self
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `studytrack.toml` in the current directory
/// 2. `~/.config/studytrack/config.toml`
///
/// Environment variable overrides: `STUDYTRACK_API_URL`, `STUDYTRACK_DATA_DIR`.
pub fn load_config() -> Result<StudytrackConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<StudytrackConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("studytrack.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            parse_config(&path)?
        }
        None => StudytrackConfig::default(),
    };

    Ok(config
        .resolved()
        .apply_overrides(|name| std::env::var(name).ok()))
}

fn parse_config(path: &Path) -> Result<StudytrackConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<StudytrackConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("studytrack"))
}

/// Create a store instance from its configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn CompletionStore>> {
    match config {
        StoreConfig::Http { base_url } => Ok(Arc::new(HttpStore::new(base_url)?)),
        StoreConfig::File { dir } => Ok(Arc::new(
            FileStore::open(dir)
                .with_context(|| format!("failed to open data directory {}", dir.display()))?,
        )),
        StoreConfig::Memory => Ok(Arc::new(MockStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_STUDYTRACK_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_STUDYTRACK_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_STUDYTRACK_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("no refs"), "no refs");
        std::env::remove_var("_STUDYTRACK_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = StudytrackConfig::default();
        assert_eq!(config.executor.timeout_ms, 5000);
        assert_eq!(config.executor.node_binary, "node");
        assert!(matches!(config.store, StoreConfig::File { .. }));
        assert!(config.curriculum.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
curriculum = "curriculum/lessons.json"

[store]
type = "http"
base_url = "http://localhost:5001/api"

[executor]
node_binary = "/usr/local/bin/node"
timeout_ms = 2000
"#;
        let config: StudytrackConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Http {
                base_url: "http://localhost:5001/api".into()
            }
        );
        assert_eq!(config.executor.timeout_ms, 2000);
        assert_eq!(config.curriculum, Some(PathBuf::from("curriculum/lessons.json")));
    }

    #[test]
    fn parse_file_store_with_defaults() {
        let config: StudytrackConfig = toml::from_str("[store]\ntype = \"file\"\n").unwrap();
        assert_eq!(
            config.store,
            StoreConfig::File {
                dir: PathBuf::from(".studytrack")
            }
        );
        assert_eq!(config.executor, ExecutorConfig::default());
    }

    #[test]
    fn env_overrides_pick_the_store() {
        let config = StudytrackConfig::default().apply_overrides(|name| match name {
            "STUDYTRACK_API_URL" => Some("http://api.test".into()),
            _ => None,
        });
        assert_eq!(
            config.store,
            StoreConfig::Http {
                base_url: "http://api.test".into()
            }
        );

        let config = config.apply_overrides(|name| match name {
            "STUDYTRACK_API_URL" => Some("http://api.test".into()),
            "STUDYTRACK_DATA_DIR" => Some("/tmp/st".into()),
            _ => None,
        });
        assert_eq!(
            config.store,
            StoreConfig::File {
                dir: PathBuf::from("/tmp/st")
            }
        );
    }

    #[test]
    fn load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studytrack.toml");
        std::fs::write(&path, "[executor]\ntimeout_ms = 0\n").unwrap();
        let config = parse_config(&path).unwrap();
        assert_eq!(config.executor.timeout_ms, 0);

        assert!(load_config_from(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn create_store_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = create_store(&StoreConfig::File {
            dir: dir.path().join("data"),
        })
        .unwrap();
        assert_eq!(store.name(), "file");
        assert_eq!(create_store(&StoreConfig::Memory).unwrap().name(), "mock");
        assert_eq!(
            create_store(&StoreConfig::Http {
                base_url: String::new()
            })
            .unwrap()
            .name(),
            "http"
        );
    }
}
