//! Constructor methods for TallyError

use super::types::TallyError;

impl TallyError {
    /// Create an unknown instrument error
    pub fn unknown_instrument(name: impl Into<String>) -> Self {
        Self::UnknownInstrument { name: name.into() }
    }

    /// Create an invalid value error
    pub fn invalid_value(instrument: impl Into<String>, value: f64, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            instrument: instrument.into(),
            value,
            reason: reason.into(),
        }
    }

    /// Create a duplicate instrument error
    pub fn duplicate_instrument(
        name: impl Into<String>,
        existing: impl Into<String>,
        requested: impl Into<String>,
    ) -> Self {
        Self::DuplicateInstrument {
            name: name.into(),
            existing: existing.into(),
            requested: requested.into(),
        }
    }

    /// Create an invalid name error
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported attribute error
    pub fn unsupported_attribute(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedAttribute {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a span closed error
    pub fn span_closed(span: impl Into<String>) -> Self {
        Self::SpanClosed { span: span.into() }
    }

    /// Create an export failure
    pub fn export_failure(message: impl Into<String>) -> Self {
        Self::ExportFailure {
            message: message.into(),
            target: None,
        }
    }

    /// Create an export failure naming the target it was sent to
    pub fn export_failure_to(message: impl Into<String>, target: impl Into<String>) -> Self {
        Self::ExportFailure {
            message: message.into(),
            target: Some(target.into()),
        }
    }

    /// Create a shutdown error for the rejected operation
    pub fn shutdown(operation: impl Into<String>) -> Self {
        Self::ManagerShutdown {
            operation: operation.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create an HTTP error
    pub fn http(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status_code,
        }
    }
}
