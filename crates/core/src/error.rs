use thiserror::Error;

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type for the mosaic framework
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while loading or consulting project settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASES not configured in project settings")]
    DatabasesMissing,

    #[error("{name:?} not present in DATABASES configuration")]
    DatabaseMissing { name: String },

    #[error("invalid value for {field}: {value:?} (expected {expected})")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

impl ConfigError {
    /// Create a missing-database error for a named entry
    pub fn database_missing(name: impl Into<String>) -> Self {
        Self::DatabaseMissing { name: name.into() }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}
