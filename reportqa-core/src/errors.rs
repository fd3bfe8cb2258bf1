//! Error taxonomy for an analysis run.
//!
//! Only [`ParseError`] and [`ConfigError`] are fatal to a run (see [`EngineError`]).
//! Everything else degrades to a skip marker so callers can report partial results.

use std::path::PathBuf;

/// The segment model handed to the engine is malformed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("document contains no analyzable text")]
    Empty,

    #[error("segment {index} has invalid page number {page} (pages are 1-indexed)")]
    InvalidPage { index: usize, page: u32 },

    #[error("segment {index} is out of document order: {reason}")]
    NonMonotonic { index: usize, reason: String },
}

/// The rule configuration cannot be used safely.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value for {language}.{check}.{field}: {reason}")]
    InvalidValue {
        language: String,
        check: String,
        field: String,
        reason: String,
    },

    #[error("invalid pattern for {language}.{check}: {source}")]
    InvalidPattern {
        language: String,
        check: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid engine setting {field}: {reason}")]
    InvalidEngineSetting { field: String, reason: String },
}

/// The classifier artifact is missing or corrupt.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("model artifact not found at {0}")]
    NotFound(PathBuf),

    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model artifact is corrupt: {0}")]
    Corrupt(String),

    #[error("unsupported model format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Network, auth or timeout exhaustion on the remote semantic check.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteServiceError {
    #[error("remote service rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("remote service returned HTTP {status}")]
    Status { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// A single check could not complete. Recorded as a skip marker; the run continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("check {check_id} failed: {reason}")]
pub struct CheckFailure {
    pub check_id: String,
    pub reason: String,
}

impl CheckFailure {
    pub fn new(check_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            check_id: check_id.into(),
            reason: reason.into(),
        }
    }

    pub fn remote(check_id: impl Into<String>, err: &RemoteServiceError) -> Self {
        Self::new(check_id, err.to_string())
    }
}

/// Fatal conditions that abort a run before any check executes.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
