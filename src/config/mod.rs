use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;

/// Runtime configuration for the binary, sourced from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Fixed scoring payload injected with every request: the private-owner
/// denylist, the grade-exclusion list, the authority roster for bulk runs,
/// and the plan-submission cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub private_owners: Vec<String>,
    pub excluded_grades: Vec<String>,
    pub roster: Vec<String>,
    pub submission_cutoff: NaiveDateTime,
}

impl ScoringConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            private_owners: Vec::new(),
            excluded_grades: Vec::new(),
            roster: Vec::new(),
            submission_cutoff: default_submission_cutoff(),
        }
    }
}

/// Statutory plan-submission deadline: 2025-02-28, end of day, inclusive.
fn default_submission_cutoff() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 2, 28)
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .expect("statutory cutoff is a valid calendar date")
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: String,
        source: std::io::Error,
    },
    Json {
        path: String,
        source: serde_json::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, .. } => {
                write!(f, "could not read scoring config {path}")
            }
            ConfigError::Json { path, .. } => {
                write!(f, "scoring config {path} is not valid JSON")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Json { source, .. } => Some(source),
        }
    }
}
