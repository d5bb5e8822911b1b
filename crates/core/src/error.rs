//! Domain error model.

use thiserror::Error;

use crate::money::Money;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Variants that
/// describe a rejected state change carry enough structured data for the caller
/// to render an actionable message without re-querying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed or missing required input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation not permitted in the entity's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A status change outside the entity's fixed transition table.
    #[error("invalid transition from {current} to {requested} (allowed: {allowed:?})")]
    InvalidTransition {
        current: String,
        requested: String,
        allowed: Vec<String>,
    },

    /// The acting identity is not the entity's authorized actor.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A unique-constraint violation (LOA number, one EMD per offer).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A requested commitment exceeds the remaining allocatable balance.
    #[error("insufficient balance: requested {requested}, remaining {remaining}")]
    InsufficientBalance { requested: Money, remaining: Money },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_transition(
        current: impl Into<String>,
        requested: impl Into<String>,
        allowed: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::InvalidTransition {
            current: current.into(),
            requested: requested.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::Duplicate(msg.into())
    }

    pub fn insufficient_balance(requested: Money, remaining: Money) -> Self {
        Self::InsufficientBalance {
            requested,
            remaining,
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
