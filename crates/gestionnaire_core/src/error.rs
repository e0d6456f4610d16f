//! Error taxonomy returned by every core operation.
//!
//! # Invariants
//! - Storage failures are never swallowed: they surface as `Storage` or
//!   `StorageUnavailable` with the gateway error attached.
//! - The core never retries; callers own retry policy.

use crate::model::validation::ValidationError;
use crate::repo::document_store::{Collection, StoreError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug)]
pub enum CoreError {
    /// Malformed pagination, filter, identifier or entity input.
    InvalidArgument(String),
    /// Update targeted a document that does not exist.
    NotFound { collection: Collection, id: String },
    /// Atomic multi-collection write did not complete; nothing was kept.
    TransactionFailed(Box<CoreError>),
    /// Storage could not be reached.
    StorageUnavailable(StoreError),
    /// Any other storage failure, unchanged.
    Storage(StoreError),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::NotFound { collection, id } => write!(f, "{collection} document not found: {id}"),
            Self::TransactionFailed(cause) => write!(f, "transaction failed: {cause}"),
            Self::StorageUnavailable(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "storage error: {err}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TransactionFailed(cause) => Some(cause.as_ref()),
            Self::StorageUnavailable(err) | Self::Storage(err) => Some(err),
            Self::InvalidArgument(_) | Self::NotFound { .. } => None,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(_) => Self::StorageUnavailable(value),
            other => Self::Storage(other),
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidArgument(value.to_string())
    }
}

impl CoreError {
    /// Wraps a failure inside an atomic write, keeping the original cause.
    pub(crate) fn transaction_failed(cause: CoreError) -> Self {
        match cause {
            already @ Self::TransactionFailed(_) => already,
            other => Self::TransactionFailed(Box::new(other)),
        }
    }
}
