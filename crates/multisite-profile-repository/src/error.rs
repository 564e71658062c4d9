//! Error types for profile repository operations

use crate::keys::ProfileId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during profile repository operations
#[derive(Error, Debug)]
pub enum ProfileRepositoryError {
    /// Reading a key from the backing store failed
    #[error("Failed to read storage key {key}: {source}")]
    StorageReadFailed {
        /// The key being read
        key: String,
        /// Source error
        source: StorageError,
    },

    /// Writing or deleting a key in the backing store failed
    #[error("Failed to write storage key {key}: {source}")]
    StorageWriteFailed {
        /// The key being written
        key: String,
        /// Source error
        source: StorageError,
    },

    /// A collaborator repository rejected a request
    #[error("Collaborator call {operation} failed: {source}")]
    Collaborator {
        /// The collaborator operation that failed
        operation: String,
        /// Source error
        source: CollaboratorError,
    },

    /// Every representable profile id is taken
    #[error("No free profile id left")]
    IdSpaceExhausted,

    /// Some steps of a cascading delete did not complete
    #[error(
        "Deleting profile {profile_id} left {} step(s) incomplete: {}",
        .failed_steps.len(),
        step_list(.failed_steps)
    )]
    CascadeIncomplete {
        /// The profile being deleted
        profile_id: ProfileId,
        /// Every step that failed, with its error
        failed_steps: Vec<FailedStep>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProfileRepositoryError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::StorageReadFailed { .. } => true,
            Self::StorageWriteFailed { .. } => true,
            Self::Collaborator { .. } => true,
            Self::IdSpaceExhausted => false,
            Self::CascadeIncomplete { .. } => true,
            Self::Config(_) => false,
        }
    }

    /// Create a read error for `key`
    pub fn read_failed(key: impl Into<String>, source: StorageError) -> Self {
        Self::StorageReadFailed {
            key: key.into(),
            source,
        }
    }

    /// Create a write error for `key`
    pub fn write_failed(key: impl Into<String>, source: StorageError) -> Self {
        Self::StorageWriteFailed {
            key: key.into(),
            source,
        }
    }

    /// Create a collaborator error
    pub fn collaborator(operation: impl Into<String>, source: CollaboratorError) -> Self {
        Self::Collaborator {
            operation: operation.into(),
            source,
        }
    }
}

/// A cascading delete step that did not complete
#[derive(Debug)]
pub struct FailedStep {
    /// What the step was doing
    pub step: String,
    /// Why it failed
    pub error: ProfileRepositoryError,
}

impl FailedStep {
    /// Record a failed step
    pub fn new(step: impl Into<String>, error: ProfileRepositoryError) -> Self {
        Self {
            step: step.into(),
            error,
        }
    }
}

fn step_list(steps: &[FailedStep]) -> String {
    steps
        .iter()
        .map(|failed| failed.step.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Backing store errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to read the store file
    #[error("Failed to read file {path}: {source}")]
    ReadFailed {
        /// Path to the file
        path: PathBuf,
        /// Source error
        source: std::io::Error,
    },

    /// Failed to write the store file
    #[error("Failed to write file {path}: {source}")]
    WriteFailed {
        /// Path to the file
        path: PathBuf,
        /// Source error
        source: std::io::Error,
    },

    /// The store file does not hold a JSON object of strings
    #[error("Store file {path} is corrupt: {source}")]
    Corrupt {
        /// Path to the file
        path: PathBuf,
        /// Source error
        source: serde_json::Error,
    },

    /// The store refused the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Create a read error
    pub fn read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a write error
    pub fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while building a property mapping table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// Tag is not lowercase ASCII letters followed by one `_`
    #[error("Tag '{0}' must be lowercase ASCII letters followed by a single '_'")]
    InvalidTag(String),

    /// Tag collides with the name or description tag
    #[error("Tag '{0}' is reserved")]
    ReservedTag(String),

    /// Property name registered twice
    #[error("Property '{0}' is already mapped")]
    DuplicateProperty(String),

    /// Tag used by two properties
    #[error("Tag '{tag}' is already used by property '{property}'")]
    DuplicateTag {
        /// The colliding tag
        tag: String,
        /// The property that owns it
        property: String,
    },
}

/// Opaque error returned by collaborator repositories
#[derive(Error, Debug)]
#[error("{0}")]
pub struct CollaboratorError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl CollaboratorError {
    /// Wrap any error type
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self(source.into())
    }
}
