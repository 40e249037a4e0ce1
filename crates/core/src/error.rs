//! Service error types.
//!
//! Two channels are kept deliberately distinct: business outcomes travel as
//! result values (`PublishResult`, `OperationResult`), while this error type
//! carries precondition and invariant violations that abort the whole
//! operation and roll the enclosing scope back.

use thiserror::Error;

use crate::composition::CompositionConflicts;

/// Errors raised by the content services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A precondition was violated (missing parent, name too long,
    /// mixing publish operations, corrupted invariants).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The requested culture does not fit the content type's variance.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// An entity that must exist could not be found.
    #[error("entity {0} not found")]
    NotFound(i32),

    /// A composition change would introduce alias collisions somewhere in
    /// the composition graph.
    #[error("invalid composition on content type '{alias}': {conflicts}")]
    InvalidComposition {
        alias: String,
        conflicts: CompositionConflicts,
    },

    /// The repository collaborator failed.
    #[error("repository failure")]
    Repository(#[from] anyhow::Error),
}

/// Result type alias using ServiceError.
pub type ServiceResult<T> = Result<T, ServiceError>;
