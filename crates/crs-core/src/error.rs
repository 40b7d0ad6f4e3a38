//! Error types for spec parsing and config loading.

use std::path::PathBuf;

use thiserror::Error;

/// A cpu or memory specification string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid cpuset '{spec}': {reason}")]
    CpuSet { spec: String, reason: String },

    #[error("invalid memory size '{spec}': {reason}")]
    Memory { spec: String, reason: String },
}

impl ParseError {
    pub(crate) fn cpuset(spec: &str, reason: impl Into<String>) -> Self {
        ParseError::CpuSet {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn memory(spec: &str, reason: impl Into<String>) -> Self {
        ParseError::Memory {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading or shaping configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("worker '{worker}': {source}")]
    Worker {
        worker: String,
        #[source]
        source: ParseError,
    },

    #[error("crs '{crs}': {reason}")]
    Crs { crs: String, reason: String },

    #[error("invalid {kind} name '{name}': use letters, digits, '.', '_' or '-'")]
    InvalidName { kind: &'static str, name: String },
}
