//! Error types for Funnel Sim.

/// Top-level error type for the simulator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Insight error: {0}")]
    Insight(#[from] InsightError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("CSV backup failed: {0}")]
    CsvBackup(String),
}

/// Session state machine errors.
///
/// Completing or abandoning a terminal session is a precondition violation:
/// the call fails, the session and the record store are left untouched.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session is already terminal ({phase}), cannot {operation}")]
    AlreadyTerminal { phase: String, operation: String },

    #[error("A step is still processing, try again when it finishes")]
    Busy,
}

/// Insight generation errors.
#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("No session data available for analysis")]
    NoData,

    #[error("Insight generation failed: {0}")]
    Generation(String),
}

/// Result type alias for the simulator.
pub type Result<T> = std::result::Result<T, Error>;
