//! Error types for the row-level authorization engine

use rowguard_core::{EntityKind, Operation, PrincipalId, RowId};
use thiserror::Error;

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// No profile row exists for the principal in either profile table.
    /// Treated as "no access" by policy checks, not as a pipeline failure.
    #[error("no profile found for principal {0}")]
    NotFound(PrincipalId),

    /// A predicate evaluated false; the operation is refused.
    #[error("{operation} denied on {entity}: {reason}")]
    Denied {
        entity: EntityKind,
        operation: Operation,
        reason: String,
    },

    /// A governed entity has no registered predicate for the attempted
    /// operation. Fatal: the operation is blocked, never allowed through.
    #[error("no policy registered for {operation} on {entity}")]
    NotRegistered {
        entity: EntityKind,
        operation: Operation,
    },

    /// Target row does not exist
    #[error("row not found in {entity}: {id}")]
    RowMissing { entity: EntityKind, id: RowId },

    /// Row data could not be evaluated against a predicate
    #[error("invalid row data: {0}")]
    InvalidRow(String),

    /// No privileged routine bound under the requested name
    #[error("no privileged routine named '{0}'")]
    UnknownRoutine(String),

    /// Storage collaborator failure
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
