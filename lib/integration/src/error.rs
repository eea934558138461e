//! Error types for the integration crate.
//!
//! - `ConnectorError`: a request to an external service failed
//! - `StoreError`: the profile store rejected a write or read

use std::fmt;

/// Errors from connector operations (source fetches, notifications).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// Connection to the service failed.
    ConnectionFailed { url: String, reason: String },
    /// The service answered with a non-success status.
    UnexpectedStatus { url: String, status: u16 },
    /// The response body could not be read.
    BodyUnreadable { url: String, reason: String },
    /// The connector is missing required configuration.
    NotConfigured { connector: String },
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed { url, reason } => {
                write!(f, "request to {url} failed: {reason}")
            }
            Self::UnexpectedStatus { url, status } => {
                write!(f, "request to {url} returned status {status}")
            }
            Self::BodyUnreadable { url, reason } => {
                write!(f, "failed to read response from {url}: {reason}")
            }
            Self::NotConfigured { connector } => {
                write!(f, "connector '{connector}' is not configured")
            }
        }
    }
}

impl std::error::Error for ConnectorError {}

/// Errors from profile store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The write failed.
    WriteFailed { key: String, reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed { key, reason } => {
                write!(f, "failed to upsert '{key}': {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_error_display() {
        let err = ConnectorError::UnexpectedStatus {
            url: "https://example.com".to_string(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "request to https://example.com returned status 503"
        );
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::WriteFailed {
            key: "candidate:c1".to_string(),
            reason: "disk full".to_string(),
        };
        assert!(err.to_string().contains("candidate:c1"));
    }
}
