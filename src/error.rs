use thiserror::Error;

/// Failures while loading or validating scoring configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scoring tables from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scoring tables: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid scoring tables: {0}")]
    Invalid(String),

    #[error("invalid value for {name}: {value}")]
    Env { name: &'static str, value: String },
}

/// Failures in the profile / match-history repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to (de)serialize match detail: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid timestamp in store: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),
}
