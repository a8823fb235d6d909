//! Error types for the editor

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::page::PageState;
use crate::reorder::ReorderError;

/// Remote operation that produced a [`GatewayError`]. The same status
/// means different things depending on what was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Lock,
    Unlock,
    Persist,
    Publish,
    Unpublish,
    Create,
    Delete,
    Query,
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Page does not exist")]
    NotFound,

    #[error("Page is locked by {owner}")]
    LockConflict { owner: String },

    #[error("Page has been modified by someone else in the meantime")]
    Conflict,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Page cannot be edited in state {0}")]
    NotEditable(PageState),

    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    #[error("Editor template error: {0}")]
    Field(#[from] FieldError),

    #[error("Drop rejected: {0}")]
    Reorder(#[from] ReorderError),
}

impl EditorError {
    pub fn from_gateway(operation: Operation, err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound => EditorError::NotFound,
            GatewayError::Locked { owner } => EditorError::LockConflict {
                owner: owner.unwrap_or_else(|| "another user".to_string()),
            },
            GatewayError::PreconditionFailed if operation == Operation::Publish => {
                EditorError::Validation(
                    "page references resources that no longer validate".to_string(),
                )
            }
            GatewayError::PreconditionFailed => EditorError::Conflict,
            other @ (GatewayError::Unauthorized
            | GatewayError::Status(_)
            | GatewayError::Transport(_)
            | GatewayError::Codec(_)) => EditorError::Transport(other.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("Composer not found: {0}")]
    ComposerNotFound(String),

    #[error("Index {index} out of range for composer {composer} of length {len}")]
    IndexOutOfRange {
        composer: String,
        index: usize,
        len: usize,
    },
}

/// Editor template authoring errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Form field has no name")]
    MissingName,

    #[error("Form field name {0:?} is neither element:<key> nor property:<key>")]
    MalformedName(String),
}
