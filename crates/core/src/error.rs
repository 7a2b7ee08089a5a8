//! Error types for Concord
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! A vetoed save is not an error: it is reported as `Ok(false)` by the
//! mediation entry points.

use crate::types::{EntityId, EntityType};
use thiserror::Error;

/// Result type alias for Concord operations
pub type ConcordResult<T> = std::result::Result<T, ConcordError>;

/// Error types for mediated saves
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConcordError {
    /// A context was opened twice for the same root on one execution path
    ///
    /// Indicates a coordinator bug; not recoverable.
    #[error("Mediation already open for root {root}")]
    AlreadyOpen {
        /// Root key that was already open
        root: String,
    },

    /// A dependent entity has no owning root to mediate through
    #[error("Unresolved root for {entity_type} entity {entity}")]
    UnresolvedRoot {
        /// Type of the dependent entity
        entity_type: EntityType,
        /// The dependent entity (display form)
        entity: String,
    },

    /// A reconciliation or caching operation failed
    #[error("Operation '{operation}' failed: {reason}")]
    PhaseFailure {
        /// Name of the failing operation
        operation: String,
        /// Human-readable failure reason
        reason: String,
    },

    /// The optimistic-lock counter was advanced by a concurrent mediation
    #[error("Stale version for entity {entity}: expected {expected}, found {found}")]
    StaleVersion {
        /// Entity whose counter moved
        entity: EntityId,
        /// Counter value observed by this transaction
        expected: i64,
        /// Counter value currently committed
        found: i64,
    },

    /// A lock counter is declared without a timestamp, so bumping is a no-op
    #[error("Entity type {entity_type} declares lock counter '{lock_attribute}' without a timestamp attribute")]
    MisconfiguredVersioning {
        /// The misconfigured entity type
        entity_type: EntityType,
        /// The declared lock-counter attribute
        lock_attribute: String,
    },

    /// Entity type has no registration (strict registration only)
    #[error("Entity type {0} is not registered")]
    NotRegistered(EntityType),

    /// Entity type registered twice
    #[error("Entity type {0} is registered more than once")]
    DuplicateRegistration(EntityType),

    /// Registration is structurally invalid
    #[error("Invalid registration for {entity_type}: {reason}")]
    InvalidRegistration {
        /// The offending entity type
        entity_type: EntityType,
        /// What is wrong
        reason: String,
    },

    /// Nested saves exceeded the configured depth
    #[error("Nested save depth {depth} exceeds limit {limit}")]
    NestingTooDeep {
        /// Depth reached
        depth: usize,
        /// Configured limit
        limit: usize,
    },

    /// Entity not found in storage
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Operation requires an active transaction
    #[error("Transaction not active: {0}")]
    TransactionNotActive(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConcordError {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ConcordError::Internal(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ConcordError::InvalidInput(message.into())
    }

    /// Create a phase failure for a named operation
    pub fn phase_failure(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        ConcordError::PhaseFailure {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Whether the whole logical transaction may succeed if re-run
    pub fn is_conflict(&self) -> bool {
        matches!(self, ConcordError::StaleVersion { .. })
    }

    /// Whether this error indicates a coordinator invariant violation
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConcordError::AlreadyOpen { .. } | ConcordError::Internal(_)
        )
    }
}
