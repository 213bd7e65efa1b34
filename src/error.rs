use std::fmt;

use thiserror::Error;

use crate::types::SqlType;

/// Kind of integrity constraint reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    Check,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintKind::Unique => "unique",
            ConstraintKind::ForeignKey => "foreign key",
            ConstraintKind::Check => "check",
        };
        f.write_str(name)
    }
}

/// Error reported by a database driver.
/// Drivers classify backend failures into these kinds before handing them back.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    #[error("{kind} constraint violated: {message}")]
    ConstraintViolation {
        kind: ConstraintKind,
        message: String,
    },

    #[error("Lock conflict: {0}")]
    LockConflict(String),

    #[error("Statement timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

/// Result type alias for driver calls
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// A malformed query: wrong usage of the DSL, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("No alias for table '{0}'")]
    NoAlias(String),

    #[error("Type mismatch on {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: SqlType,
        actual: SqlType,
    },

    #[error("Empty WHERE clause is not allowed for {0}")]
    EmptyWhereClause(String),

    #[error("Missing id value for {0}")]
    MissingId(String),

    #[error("Missing version value for {0}")]
    MissingVersion(String),

    #[error("Unbound template parameter ':{0}'")]
    UnboundTemplateParameter(String),

    #[error("Entity '{0}' does not take part in this query")]
    UnknownEntity(String),

    #[error("Sequence '{name}' is registered with increment {registered}, not {requested}")]
    ConflictingSequence {
        name: String,
        registered: i64,
        requested: i64,
    },

    #[error("Not supported by the {dialect} dialect: {feature}")]
    Unsupported {
        dialect: &'static str,
        feature: &'static str,
    },
}

/// Error type for relq operations
#[derive(Debug, Error)]
pub enum RelqError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("{kind} constraint violated: {message}")]
    ConstraintViolation {
        kind: ConstraintKind,
        message: String,
    },

    #[error("Optimistic lock conflict on {table}{}", batch_suffix(.batch_index))]
    OptimisticLockConflict {
        table: String,
        batch_index: Option<usize>,
    },

    #[error("Identifier generation for '{key}' gave up after {attempts} attempts")]
    IdentifierGenerationExhausted { key: String, attempts: u32 },

    #[error("Identifier generation failed: {0}")]
    IdentifierGeneration(String),

    #[error(transparent)]
    Execution(DriverError),

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Cannot map value: {0}")]
    Mapping(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl From<DriverError> for RelqError {
    fn from(error: DriverError) -> Self {
        match error {
            DriverError::ConstraintViolation { kind, message } => {
                RelqError::ConstraintViolation { kind, message }
            }
            other => RelqError::Execution(other),
        }
    }
}

fn batch_suffix(index: &Option<usize>) -> String {
    index
        .map(|i| format!(" (batch entry {i})"))
        .unwrap_or_default()
}

/// Result type alias for relq operations
pub type Result<T> = std::result::Result<T, RelqError>;
