//! UnifiedError trait implementation for TallyError

use super::types::{TallyError, UnifiedError};

impl UnifiedError for TallyError {
    fn error_code(&self) -> &str {
        match self {
            Self::UnknownInstrument { .. } => "TALLY_UNKNOWN_INSTRUMENT",
            Self::InvalidValue { .. } => "TALLY_INVALID_VALUE",
            Self::DuplicateInstrument { .. } => "TALLY_DUPLICATE_INSTRUMENT",
            Self::InvalidName { .. } => "TALLY_INVALID_NAME",
            Self::UnsupportedAttribute { .. } => "TALLY_UNSUPPORTED_ATTRIBUTE",
            Self::SpanClosed { .. } => "TALLY_SPAN_CLOSED",
            Self::ExportFailure { .. } => "TALLY_EXPORT_FAILURE",
            Self::ManagerShutdown { .. } => "TALLY_SHUTDOWN",
            Self::Config { .. } => "TALLY_CONFIG",
            Self::Http { .. } => "TALLY_HTTP",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ManagerShutdown { .. } | Self::Config { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            TallyError::unknown_instrument("x").error_code(),
            "TALLY_UNKNOWN_INSTRUMENT"
        );
        assert_eq!(
            TallyError::shutdown("record").error_code(),
            "TALLY_SHUTDOWN"
        );
        assert_eq!(
            TallyError::http("collector returned 503", Some(503)).error_code(),
            "TALLY_HTTP"
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(TallyError::export_failure("connection refused").is_recoverable());
        assert!(TallyError::invalid_value("c", -1.0, "negative").is_recoverable());
        assert!(!TallyError::shutdown("record").is_recoverable());
        assert!(!TallyError::config("bad").is_recoverable());
        assert!(TallyError::http("connection reset", None).is_recoverable());
    }
}
