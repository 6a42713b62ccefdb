//! Error types for rowbind

use thiserror::Error;

/// Result type alias for rowbind operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while mapping, binding or scanning
#[derive(Error, Debug)]
pub enum Error {
    /// MySQL driver error
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// The query produced no rows where exactly one was required
    #[error("no rows in result set")]
    NoRows,

    /// A result column has no destination field and permissive mode is off
    #[error("missing destination name {column} in {type_name}")]
    MissingField {
        column: String,
        type_name: &'static str,
    },

    /// A direct-scan destination was paired with a result that does not have exactly one column
    #[error("scannable dest type {type_name} with {columns} columns in result, expected 1")]
    ScalarColumnCount {
        type_name: &'static str,
        columns: usize,
    },

    /// A named marker has no value in the argument source
    #[error("could not find name {0} in argument source")]
    UnknownParameter(String),

    /// An argument cannot be bound as given
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The destination does not fit the requested scan mode
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A record type reaches itself through its nested fields
    #[error("cyclic record definition: {0}")]
    CyclicRecord(String),

    /// Type conversion error
    #[error("Type conversion error: expected {expected}, got {actual}")]
    TypeConversion {
        expected: &'static str,
        actual: String,
    },

    /// The cursor was used after it was closed
    #[error("cursor is closed")]
    CursorClosed,

    /// Query execution error
    #[error("Query error: {0}")]
    Query(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
