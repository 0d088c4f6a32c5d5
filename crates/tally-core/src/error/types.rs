//! Core error types and traits for Tally

use thiserror::Error;

/// Result type alias for Tally operations
pub type TallyResult<T> = Result<T, TallyError>;

/// Common behaviour shared by all Tally errors.
///
/// - error_code(): stable identifier for programmatic handling
/// - is_recoverable(): whether the pipeline keeps running after this error
pub trait UnifiedError: std::error::Error + Send + Sync {
    /// Get the error code for programmatic handling
    fn error_code(&self) -> &str;

    /// Whether the pipeline stays usable after this error
    fn is_recoverable(&self) -> bool {
        true
    }
}

/// Main error type for Tally
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TallyError {
    /// `record` referenced a name that was never created
    #[error("Unknown instrument: {name}")]
    UnknownInstrument { name: String },

    /// Value rejected by the instrument (negative delta on a counter, NaN, ...)
    #[error("Invalid value {value} for instrument '{instrument}': {reason}")]
    InvalidValue {
        instrument: String,
        value: f64,
        reason: String,
    },

    /// Name already registered with a different kind
    #[error("Instrument '{name}' already registered as {existing}, cannot create it as {requested}")]
    DuplicateInstrument {
        name: String,
        existing: String,
        requested: String,
    },

    /// Instrument name does not follow the naming rules
    #[error("Invalid instrument name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Attribute value outside the supported scalar set
    #[error("Unsupported attribute '{key}': {message}")]
    UnsupportedAttribute { key: String, message: String },

    /// Span was mutated after it ended
    #[error("Span '{span}' has already ended")]
    SpanClosed { span: String },

    /// Sink rejected or failed to deliver a batch
    #[error("Export failed: {message}")]
    ExportFailure {
        message: String,
        target: Option<String>,
    },

    /// Mutating call after the pipeline was stopped
    #[error("Telemetry pipeline is shut down, rejected {operation}")]
    ManagerShutdown { operation: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Collector unreachable or answered with a non-2xx status
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        status_code: Option<u16>,
    },
}
