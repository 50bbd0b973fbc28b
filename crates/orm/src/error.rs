//! Error types for the mosaic database layer
//!
//! The taxonomy distinguishes configuration problems, caller mistakes caught
//! before any database work (scope, state preconditions, formats), and
//! failures from the database itself.

use thiserror::Error;

/// Result type alias for database-layer operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error type for schema and migration operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database connection or statement execution error
    #[error("database error: {0}")]
    Database(String),

    /// Required settings absent or malformed
    #[error(transparent)]
    Configuration(#[from] mosaic_core::ConfigError),

    /// A caller-supplied scope name matched no known component or model
    #[error("unknown name in scope filter: {0:?}")]
    Scope(String),

    /// Table or column definition problem in a metadata collection
    #[error("schema error: {0}")]
    Schema(String),

    /// Operation rejected before touching the database
    #[error("{0}")]
    Precondition(String),

    /// Malformed revision range or revision file
    #[error("format error: {0}")]
    Format(String),

    /// Migration bookkeeping failure (scripts, revision chain, version table)
    #[error("migration error: {0}")]
    Migration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrmError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration(message.into())
    }
}

impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        OrmError::Database(err.to_string())
    }
}

impl From<url::ParseError> for OrmError {
    fn from(err: url::ParseError) -> Self {
        OrmError::Database(format!("invalid database URL: {}", err))
    }
}
