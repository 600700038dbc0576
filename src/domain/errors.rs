//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The HTTP layer maps them onto status codes in `api::error`.

use std::fmt;

use sea_orm::{DbErr, SqlErr, TransactionError};

/// Invariant that a requested mutation would break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    RoomFull,
    GenderMismatch,
    DuplicateActiveContract,
    DuplicateInvoice,
    HasActiveContracts,
    CapacityBelowOccupancy,
    DuplicateUsername,
}

impl ConflictKind {
    /// Machine-readable code, stable across releases.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::RoomFull => "room_full",
            ConflictKind::GenderMismatch => "gender_mismatch",
            ConflictKind::DuplicateActiveContract => "duplicate_active_contract",
            ConflictKind::DuplicateInvoice => "duplicate_invoice",
            ConflictKind::HasActiveContracts => "has_active_contracts",
            ConflictKind::CapacityBelowOccupancy => "capacity_below_occupancy",
            ConflictKind::DuplicateUsername => "duplicate_username",
        }
    }

    /// Human-readable message shown to API clients.
    pub fn message(&self) -> &'static str {
        match self {
            ConflictKind::RoomFull => "Room is already at full capacity",
            ConflictKind::GenderMismatch => "Student gender does not match the room type",
            ConflictKind::DuplicateActiveContract => "Student already has an active contract",
            ConflictKind::DuplicateInvoice => "An invoice already exists for this room and month",
            ConflictKind::HasActiveContracts => "Room still has active contracts",
            ConflictKind::CapacityBelowOccupancy => {
                "Capacity cannot be lower than the current occupancy"
            }
            ConflictKind::DuplicateUsername => "Username is already taken",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Entity exists but is in the wrong state for the operation
    #[error("invalid {entity} state: {message}")]
    InvalidState {
        entity: &'static str,
        message: String,
    },
    /// Operation would violate an invariant
    #[error("conflict: {0}")]
    Conflict(ConflictKind),
    /// Malformed or missing input, detected before touching the database
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Database/persistence error
    #[error("database error: {0}")]
    Database(String),
    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid_state(entity: &'static str, message: impl Into<String>) -> Self {
        DomainError::InvalidState {
            entity,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    /// Map a unique-constraint violation onto `kind`, anything else onto `Database`.
    pub fn unique_or(kind: ConflictKind) -> impl FnOnce(DbErr) -> DomainError {
        move |err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => DomainError::Conflict(kind),
            _ => DomainError::from(err),
        }
    }
}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl From<TransactionError<DomainError>> for DomainError {
    fn from(e: TransactionError<DomainError>) -> Self {
        match e {
            TransactionError::Connection(db) => DomainError::from(db),
            TransactionError::Transaction(inner) => inner,
        }
    }
}
