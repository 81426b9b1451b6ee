//! Error types for gradwalk.

use std::io;

use thiserror::Error;

/// Errors that can occur while walking or reporting on an object graph.
#[derive(Debug, Error)]
pub enum Error {
    /// A tensor-like node whose flags contradict each other.
    #[error("inconsistent tensor at {path}: {message}")]
    Classification { path: String, message: String },

    /// Reading a container or attribute failed mid-walk.
    #[error("cannot read node at {path}: {message}")]
    Traversal { path: String, message: String },

    /// A visitor rejected a tensor.
    #[error("visitor failed at {path}: {message}")]
    Visitor { path: String, message: String },

    /// The value passed as a model has no training flag.
    #[error("{path} is not a module: expected an object with a boolean `training` attribute")]
    NotAModule { path: String },

    /// Malformed graph snapshot.
    #[error("invalid snapshot: {message}")]
    Snapshot { message: String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn traversal(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Traversal {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn snapshot(message: impl Into<String>) -> Self {
        Error::Snapshot {
            message: message.into(),
        }
    }
}

/// Failure to read a single node's children.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("{kind} is already mutably borrowed")]
    Borrowed { kind: &'static str },

    #[error("expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },
}
