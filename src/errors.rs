use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Problems with the local setup: the credential file or the settings.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("API key file not found at {path}; create it in the working directory")]
    MissingCredential { path: PathBuf },

    #[error("Failed to read API key file {path}: {source}")]
    UnreadableCredential {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("API key file {path} is empty")]
    EmptyCredential { path: PathBuf },

    #[error("Invalid setting `{key}`: {reason}")]
    Invalid { key: String, reason: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Errors attached to individual tool calls, sent back to the model as results.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ToolError {
    #[error("unable to find tool by name '{0}'")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Date label must not be empty")]
    EmptyDateLabel,

    #[error("Model kept requesting tools after {0} rounds")]
    TooManyToolRounds(usize),

    #[error("Malformed tool call {id}: {source}")]
    MalformedToolCall {
        id: String,
        #[source]
        source: ToolError,
    },
}
