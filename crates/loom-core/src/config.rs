//! Application settings with fail-fast validation.
//!
//! Settings are loaded once at process start and injected into the state
//! manager; they are never mutated afterwards. Every construction path runs
//! [`Settings::validate`], so an invalid value fails startup instead of the
//! first operation that happens to touch it.
//!
//! Configuration sources, in precedence order:
//! 1. `LOOM_*` environment variables (explicit overrides)
//! 2. a `.env` file in the working directory (via [`Settings::load`])
//! 3. the defaults in [`crate::defaults`]

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::defaults;
use crate::error::{Error, Result};

/// Logging verbosity levels recognized in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(Error::Config(format!(
                "Log level must be one of DEBUG, INFO, WARNING, ERROR, CRITICAL, got: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    ///
    /// CRITICAL maps to `error`; tracing has no separate critical level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

/// Validated application settings.
///
/// Construct via [`Settings::load`], [`Settings::from_env`], or build a
/// value and call [`Settings::validate`] before handing it to the state
/// manager. Treat the value as immutable once validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the store service-account credentials file.
    pub credentials_path: String,
    /// Remote store project identifier.
    pub project_id: String,
    /// Root directory for local knowledge-base state. Created on
    /// validation if absent.
    pub knowledge_base_path: PathBuf,
    /// Logging verbosity.
    pub log_level: LogLevel,
    /// Maximum number of worker threads.
    pub max_workers: usize,
    /// Maximum concurrent store requests.
    pub max_concurrent_requests: usize,
    /// Domains to analyze. Order matters; must be non-empty.
    pub default_domains: Vec<String>,
    /// Minimum similarity score for a cross-domain connection, in [0, 1].
    pub similarity_threshold: f64,
    /// Minimum confidence for integration suggestions, in [0, 1].
    pub confidence_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials_path: defaults::CREDENTIALS_PATH.to_string(),
            project_id: defaults::PROJECT_ID.to_string(),
            knowledge_base_path: PathBuf::from(defaults::KNOWLEDGE_BASE_PATH),
            log_level: LogLevel::default(),
            max_workers: defaults::MAX_WORKERS,
            max_concurrent_requests: defaults::MAX_CONCURRENT_REQUESTS,
            default_domains: defaults::DEFAULT_DOMAINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            similarity_threshold: defaults::SIMILARITY_THRESHOLD,
            confidence_threshold: defaults::CONFIDENCE_THRESHOLD,
        }
    }
}

impl Settings {
    /// Load settings honoring a `.env` file, then environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Build settings from `LOOM_*` environment variables on top of the
    /// defaults, then validate.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(v) = env::var("LOOM_CREDENTIALS_PATH") {
            settings.credentials_path = v;
        }
        if let Ok(v) = env::var("LOOM_PROJECT_ID") {
            settings.project_id = v;
        }
        if let Ok(v) = env::var("LOOM_KNOWLEDGE_BASE_PATH") {
            settings.knowledge_base_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("LOOM_LOG_LEVEL") {
            settings.log_level = v.parse()?;
        }
        if let Ok(v) = env::var("LOOM_MAX_WORKERS") {
            settings.max_workers = parse_env("LOOM_MAX_WORKERS", &v)?;
        }
        if let Ok(v) = env::var("LOOM_MAX_CONCURRENT_REQUESTS") {
            settings.max_concurrent_requests = parse_env("LOOM_MAX_CONCURRENT_REQUESTS", &v)?;
        }
        if let Ok(v) = env::var("LOOM_DEFAULT_DOMAINS") {
            settings.default_domains = v
                .split(',')
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("LOOM_SIMILARITY_THRESHOLD") {
            settings.similarity_threshold = parse_env("LOOM_SIMILARITY_THRESHOLD", &v)?;
        }
        if let Ok(v) = env::var("LOOM_CONFIDENCE_THRESHOLD") {
            settings.confidence_threshold = parse_env("LOOM_CONFIDENCE_THRESHOLD", &v)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validate every field and create the knowledge-base directory.
    ///
    /// Directory creation is the only side effect of configuration.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(Error::Config("project_id must not be empty".to_string()));
        }
        if self.credentials_path.trim().is_empty() {
            return Err(Error::Config(
                "credentials_path must not be empty".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(Error::Config("max_workers must be at least 1".to_string()));
        }
        if self.max_concurrent_requests == 0 {
            return Err(Error::Config(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.default_domains.is_empty() {
            return Err(Error::Config(
                "default_domains must not be empty".to_string(),
            ));
        }
        validate_threshold("similarity_threshold", self.similarity_threshold)?;
        validate_threshold("confidence_threshold", self.confidence_threshold)?;

        std::fs::create_dir_all(&self.knowledge_base_path).map_err(|e| {
            Error::Config(format!(
                "Cannot create knowledge base path {}: {}",
                self.knowledge_base_path.display(),
                e
            ))
        })?;

        debug!(
            subsystem = "config",
            op = "validate",
            project_id = %self.project_id,
            knowledge_base_path = %self.knowledge_base_path.display(),
            log_level = %self.log_level,
            "Settings validated"
        );
        Ok(())
    }
}

fn validate_threshold(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::Config(format!(
            "{} must be in [0.0, 1.0], got: {}",
            name, value
        )));
    }
    Ok(())
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {:?} ({})", name, raw, e)))
}
