//! Error types for the graph editor.
//!
//! Only failures that abort an operation live here. Rejected connections during
//! interactive editing are reported as [`ValidationResult`](crate::ValidationResult)
//! values instead and never surface as errors.

use crate::graph::{NodeId, ValidationError};
use thiserror::Error;

/// Unified error type for all fallible editor operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    /// No node type with this name is registered.
    #[error("unknown node type '{0}'")]
    UnknownType(String),

    /// A node type with this name was registered twice.
    #[error("node type '{0}' is already registered")]
    DuplicateType(String),

    #[error("node '{0}' not found")]
    NodeNotFound(NodeId),

    /// An explicit node id collides with a live node.
    #[error("node id '{0}' is already in use")]
    DuplicateNode(NodeId),

    /// A connector record names a node that is not part of the snapshot.
    #[error("connector references node '{0}' which is not part of the snapshot")]
    DanglingReference(NodeId),

    /// A connector record resolves, but its endpoints break a pin invariant.
    #[error("connector record {index} is invalid: {reason}")]
    InvalidConnector {
        index: usize,
        reason: ValidationError,
    },

    /// A node type's `load` hook rejected its saved data.
    #[error("failed to load saved data for node '{id}': {message}")]
    Load { id: NodeId, message: String },

    #[error("snapshot version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Invalid drag or editor configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Serialization or parsing failure (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    #[error("{0}")]
    Io(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = EditorError> = std::result::Result<T, E>;

impl From<serde_json::Error> for EditorError {
    fn from(error: serde_json::Error) -> Self {
        EditorError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for EditorError {
    fn from(error: toml::de::Error) -> Self {
        EditorError::Convert(error.to_string())
    }
}

impl From<std::io::Error> for EditorError {
    fn from(error: std::io::Error) -> Self {
        EditorError::Io(error.to_string())
    }
}
