//! From implementations for TallyError

use super::types::TallyError;

impl From<reqwest::Error> for TallyError {
    fn from(error: reqwest::Error) -> Self {
        let status_code = error.status().map(|s| s.as_u16());
        if error.is_timeout() {
            return Self::Http {
                message: format!("request timed out: {}", error),
                status_code,
            };
        }
        Self::Http {
            message: error.to_string(),
            status_code,
        }
    }
}
