//! Error types for Blockflow.
//!
//! All errors in Blockflow are represented by the `BlockflowError` enum,
//! which provides specific variants for different error categories.

use std::{io::ErrorKind, string::FromUtf8Error};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Blockflow operations.
///
/// Each variant represents a specific category of error that can occur
/// during registry setup, graph loading, block execution, or storage.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum BlockflowError {
    /// Engine-level errors (startup, handler table, capabilities).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML, etc.).
    #[error("{0}")]
    Convert(String),

    /// Workflow definition errors (missing trigger, duplicate ids).
    #[error("{0}")]
    Workflow(String),

    /// Node definition errors, scoped to a node id.
    #[error("node {id} ({block}): {message}")]
    Node {
        id: i64,
        block: String,
        message: String,
    },

    /// Block registry errors.
    #[error("{0}")]
    Block(String),

    /// Action execution errors.
    #[error("{0}")]
    Action(String),

    /// Storage operation errors.
    #[error("{0}")]
    Store(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl BlockflowError {
    /// Builds a node-scoped configuration error.
    pub fn node(
        id: i64,
        block: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        BlockflowError::Node {
            id,
            block: block.into(),
            message: message.into(),
        }
    }
}

impl From<BlockflowError> for String {
    fn from(val: BlockflowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for BlockflowError {
    fn from(error: std::io::Error) -> Self {
        BlockflowError::IoError(error.to_string())
    }
}

impl From<BlockflowError> for std::io::Error {
    fn from(val: BlockflowError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<FromUtf8Error> for BlockflowError {
    fn from(_: FromUtf8Error) -> Self {
        BlockflowError::Convert("Error with utf-8 string convert".to_string())
    }
}

impl From<serde_json::Error> for BlockflowError {
    fn from(error: serde_json::Error) -> Self {
        BlockflowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for BlockflowError {
    fn from(error: toml::de::Error) -> Self {
        BlockflowError::Config(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for BlockflowError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        BlockflowError::Config(error.to_string())
    }
}

impl From<regex::Error> for BlockflowError {
    fn from(error: regex::Error) -> Self {
        BlockflowError::Action(format!("invalid regex: {}", error))
    }
}

impl From<reqwest::Error> for BlockflowError {
    fn from(error: reqwest::Error) -> Self {
        BlockflowError::Action(error.to_string())
    }
}

impl From<sqlx::Error> for BlockflowError {
    fn from(error: sqlx::Error) -> Self {
        BlockflowError::Store(error.to_string())
    }
}
