//! Layered configuration
//!
//! Values come from built-in defaults, then an optional config file, then
//! `TRIAGE__SECTION__KEY` environment variables.

use crate::error::{Result, TriageError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TRIAGE";

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_NAME: &str = "ticket-triage";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub ai: AiConfig,
    pub triage: TriageConfig,
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("dev", "ticket-triage", "ticket-triage")
            .map_or_else(
                || PathBuf::from(".ticket-triage"),
                |dirs| dirs.data_dir().to_path_buf(),
            );
        Self { data_dir }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: 24,
        }
    }
}

/// Which AI labeling backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// Offline keyword heuristic
    #[default]
    Heuristic,
    /// HTTP JSON labeling endpoint
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::Heuristic,
            endpoint: None,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl AiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Maximum concurrent triage runs
    pub workers: usize,
    /// Bounded event queue length
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Deadline for each repository call made by the worker
    pub store_timeout_ms: u64,
    /// Assign the least-loaded moderator when nobody has an overlapping skill
    pub fallback_to_least_loaded: bool,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
            store_timeout_ms: 5_000,
            fallback_to_least_loaded: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Seconds between sweeps; 0 disables the periodic sweep
    pub interval_secs: u64,
    /// Age after which an `OPEN` ticket is considered stuck
    pub stale_after_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            stale_after_secs: 600,
        }
    }
}

impl Config {
    /// Load configuration from an explicit file, or from
    /// `ticket-triage.{yaml,toml,json}` in the working directory if present
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(TriageError::Config(
                "auth.jwt_secret must be set (TRIAGE__AUTH__JWT_SECRET)".to_string(),
            ));
        }
        if self.triage.workers == 0 || self.triage.queue_capacity == 0 {
            return Err(TriageError::Config(
                "triage.workers and triage.queue_capacity must be positive".to_string(),
            ));
        }
        if self.triage.max_attempts == 0 {
            return Err(TriageError::Config(
                "triage.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.ai.provider == AiProvider::Http && self.ai.endpoint.is_none() {
            return Err(TriageError::Config(
                "ai.endpoint is required when ai.provider = \"http\"".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy with secrets replaced, for display
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.auth.jwt_secret = "<redacted>".to_string();
        if copy.ai.api_key.is_some() {
            copy.ai.api_key = Some("<redacted>".to_string());
        }
        copy
    }
}
