//! Error types for kubexp

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KxError {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    #[error("Experiment {experiment} ran out of ports")]
    ExhaustedPool { experiment: String },

    #[error("Malformed port range encoding: {0}")]
    MalformedPoolEncoding(String),

    #[error("Service {name} declared by both {first} and {second}")]
    DuplicateService {
        name: String,
        first: String,
        second: String,
    },

    #[error("Experiment already compiled: {0}")]
    AlreadyCompiled(String),

    #[error("Process group not found: {0}")]
    GroupNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KxError>;
