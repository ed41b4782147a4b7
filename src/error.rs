// src/error.rs
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SubScoutError>;

#[derive(Debug, Error)]
pub enum SubScoutError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("source error in {source_name}: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16 },

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("resolution error: {0}")]
    Resolution(String),

    #[error("output error: {0}")]
    Output(String),

    #[error("rate limit exceeded for {0}")]
    RateLimit(String),

    #[error("no API key configured for {0}")]
    ApiKey(String),

    #[error("invalid domain: {0}")]
    InvalidDomain(String),
}

impl SubScoutError {
    /// 401/403 responses point at a bad or expired credential rather than a
    /// transient provider problem.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            SubScoutError::HttpStatus { status: 401 } | SubScoutError::HttpStatus { status: 403 }
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            SubScoutError::HttpStatus { status: 429 } | SubScoutError::RateLimit(_)
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SubScoutError::Config(_) | SubScoutError::InvalidDomain(_) | SubScoutError::Output(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(SubScoutError::HttpStatus { status: 401 }.is_auth_failure());
        assert!(SubScoutError::HttpStatus { status: 403 }.is_auth_failure());
        assert!(!SubScoutError::HttpStatus { status: 429 }.is_auth_failure());
        assert!(SubScoutError::HttpStatus { status: 429 }.is_rate_limited());
        assert!(SubScoutError::RateLimit("shodan".to_string()).is_rate_limited());
        assert!(!SubScoutError::HttpStatus { status: 500 }.is_rate_limited());
    }

    #[test]
    fn test_configuration_errors() {
        assert!(SubScoutError::Config("bad regex".to_string()).is_configuration());
        assert!(SubScoutError::Output("cannot open".to_string()).is_configuration());
        assert!(!SubScoutError::Network("reset".to_string()).is_configuration());
    }
}
