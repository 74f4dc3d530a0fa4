//! Error types for the sentinel

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the sentinel
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // HTTP errors
    #[error("HTTP request to {service} failed: {message}")]
    Http { service: String, message: String },

    #[error("HTTP request to {service} timed out")]
    HttpTimeout { service: String },

    #[error("{service} returned status {status}")]
    HttpStatus { service: String, status: u16 },

    #[error("Malformed payload from {service}: {message}")]
    MalformedPayload { service: String, message: String },

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Anomaly export errors
    #[error("Export failed: {0}")]
    Export(String),

    // Notification errors
    #[error("Notification failed: {0}")]
    Notify(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Build a transport error from a reqwest failure, keeping timeouts distinct
    pub fn http(service: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::HttpTimeout {
                service: service.to_string(),
            }
        } else {
            Error::Http {
                service: service.to_string(),
                message: e.to_string(),
            }
        }
    }

    /// Check if this error is transient (next cycle may succeed)
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http { .. } | Error::HttpTimeout { .. } => true,
            Error::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// Conversion from reqwest errors where the caller has no service name
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let service = e
            .url()
            .and_then(|u| u.host_str())
            .unwrap_or("unknown")
            .to_string();
        Error::http(&service, e.without_url())
    }
}

// Conversion from rusqlite errors
impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

// Conversion from csv errors
impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Export(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let status_500 = Error::HttpStatus {
            service: "dexscreener".into(),
            status: 503,
        };
        let status_404 = Error::HttpStatus {
            service: "dexscreener".into(),
            status: 404,
        };
        assert!(status_500.is_retryable());
        assert!(!status_404.is_retryable());
        assert!(Error::HttpTimeout { service: "rugcheck".into() }.is_retryable());
        assert!(!Error::Storage("locked".into()).is_retryable());
    }

    #[test]
    fn test_display_includes_service() {
        let err = Error::HttpStatus {
            service: "dexscreener".into(),
            status: 502,
        };
        assert_eq!(err.to_string(), "dexscreener returned status 502");
    }
}
