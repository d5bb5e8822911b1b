//! Error surface of the workflow services.

use tenderflow_core::{DomainError, Money};

use crate::store::StoreError;

/// Everything a workflow operation can fail with.
///
/// Mirrors [`DomainError`] so callers see one taxonomy whether a rule was
/// enforced inside an aggregate or by a service-level cross-aggregate check,
/// plus the store-level failure modes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid transition from {current} to {requested} (allowed: {allowed:?})")]
    InvalidTransition {
        current: String,
        requested: String,
        allowed: Vec<String>,
    },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found")]
    NotFound,

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("insufficient balance: requested {requested}, remaining {remaining}")]
    InsufficientBalance { requested: Money, remaining: Money },

    /// Stale write detected by the store's version check.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<DomainError> for WorkflowError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => WorkflowError::Validation(msg),
            DomainError::InvalidState(msg) => WorkflowError::InvalidState(msg),
            DomainError::InvalidTransition {
                current,
                requested,
                allowed,
            } => WorkflowError::InvalidTransition {
                current,
                requested,
                allowed,
            },
            DomainError::Forbidden(msg) => WorkflowError::Forbidden(msg),
            DomainError::NotFound => WorkflowError::NotFound,
            DomainError::Duplicate(msg) => WorkflowError::Duplicate(msg),
            DomainError::InsufficientBalance {
                requested,
                remaining,
            } => WorkflowError::InsufficientBalance {
                requested,
                remaining,
            },
            DomainError::InvalidId(msg) => WorkflowError::Validation(msg),
            DomainError::Conflict(msg) => WorkflowError::Conflict(msg),
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Concurrency { .. } => WorkflowError::Conflict(err.to_string()),
            other => WorkflowError::Store(other),
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
