//! Run configuration
//!
//! ```json
//! {
//!   "sources": [{ "name": "easylist", "url": "https://...", "enabled": true }],
//!   "personal_rules": "personal.txt",
//!   "output_dir": "output",
//!   "dns_rewrite_target": "0.0.0.0",
//!   "metadata": { "title": "...", "description": "...", "homepage": "..." },
//!   "fetch": { "timeout_secs": 15, "retries": 3, "backoff_ms": 1000 }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use lm_compiler::{ListMetadata, RunContext, SourceEntry};
use lm_core::DEFAULT_DNS_REWRITE_TARGET;

use crate::fetch::RetryPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub timeout_secs: u64,
    /// Total attempts per source, first try included.
    pub retries: u32,
    pub backoff_ms: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            retries: 3,
            backoff_ms: 1000,
        }
    }
}

impl FetchOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retries.max(1),
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: Vec<SourceEntry>,
    pub personal_rules: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub dns_rewrite_target: String,
    pub metadata: ListMetadata,
    pub fetch: FetchOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            personal_rules: None,
            output_dir: PathBuf::from("output"),
            dns_rewrite_target: DEFAULT_DNS_REWRITE_TARGET.to_string(),
            metadata: ListMetadata::default(),
            fetch: FetchOptions::default(),
        }
    }
}

impl Config {
    /// Load and validate. A relative `personal_rules` path is resolved
    /// against the config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        if let (Some(personal), Some(base)) = (&config.personal_rules, path.parent()) {
            if personal.is_relative() {
                config.personal_rules = Some(base.join(personal));
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("source with url '{}' has no name", source.url)));
            }
            let url = source.url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("file://")) {
                return Err(ConfigError::Invalid(format!(
                    "source '{}' has unsupported url '{}'",
                    source.name, source.url
                )));
            }
        }
        if self.dns_rewrite_target.trim().is_empty() {
            return Err(ConfigError::Invalid("dns_rewrite_target is empty".to_string()));
        }
        Ok(())
    }

    /// Personal rules text; a missing file only warns.
    pub async fn read_personal_rules(&self) -> String {
        let Some(path) = &self.personal_rules else {
            return String::new();
        };
        match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Personal rules '{}' not readable: {}", path.display(), e);
                String::new()
            }
        }
    }

    pub fn run_context(&self, personal_rules: String) -> RunContext {
        RunContext::new(self.sources.clone())
            .with_personal_rules(personal_rules)
            .with_dns_rewrite_target(self.dns_rewrite_target.trim())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("listmerge.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{
                "sources": [
                    {"name": "one", "url": "https://lists.example.org/one.txt"},
                    {"name": "two", "url": "https://lists.example.org/two.txt", "enabled": false}
                ],
                "personal_rules": "personal.txt"
            }"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert!(config.sources[0].enabled);
        assert!(!config.sources[1].enabled);
        assert_eq!(config.personal_rules, Some(dir.path().join("personal.txt")));
        assert_eq!(config.dns_rewrite_target, "0.0.0.0");
        assert_eq!(config.fetch, FetchOptions::default());
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_json_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "{ \"sources\": [");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn rejects_unsupported_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), r#"{"sources": [{"name": "x", "url": "ftp://example.org/x"}]}"#);
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn missing_personal_rules_read_as_empty() {
        let config = Config {
            personal_rules: Some(PathBuf::from("/nonexistent/personal.txt")),
            ..Config::default()
        };
        assert_eq!(config.read_personal_rules().await, "");
    }

    #[test]
    fn retry_policy_never_zero_attempts() {
        let options = FetchOptions {
            retries: 0,
            ..FetchOptions::default()
        };
        assert_eq!(options.retry_policy().attempts, 1);
    }
}
