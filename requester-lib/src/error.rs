//! Error handling for request construction and dispatch.
//!
//! This module defines a single error type covering both classes of failure:
//! validation errors returned synchronously while building a [`Request`](crate::Request),
//! and execution errors delivered asynchronously through the failure callback.

use std::fmt;

/// Main error type for requester operations.
///
/// Validation variants are only ever returned from `Request::new`. Execution
/// variants are only ever handed to the dispatcher's failure callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequesterError {
    /// Address was empty or whitespace only
    EmptyAddress,

    /// Method was empty or whitespace only
    EmptyMethod,

    /// Address could not be parsed as an absolute URL
    MalformedUrl { address: String, reason: String },

    /// The outbound HTTP call could not be assembled (e.g. invalid method token)
    RequestBuildFailed { target: String, message: String },

    /// Connection, DNS or protocol failure while sending the request
    TransportFailed { target: String, message: String },

    /// Server answered with anything other than 200 OK
    NonSuccessStatus { target: String, status: u16 },

    /// Response headers arrived but the body could not be read in full
    BodyReadFailed { target: String, message: String },

    /// Work was submitted after the dispatcher was closed
    DispatcherClosed,

    /// The shared HTTP client could not be created
    ClientBuildFailed { message: String },

    /// Configuration errors (invalid settings, unparsable TOML, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading configuration
    FileError { path: String, message: String },
}

impl RequesterError {
    /// Create a new malformed URL error.
    pub fn malformed_url<A: Into<String>, R: Into<String>>(address: A, reason: R) -> Self {
        Self::MalformedUrl {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create a new request build error.
    pub fn request_build<T: Into<String>, M: Into<String>>(target: T, message: M) -> Self {
        Self::RequestBuildFailed {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a new transport error.
    pub fn transport<T: Into<String>, M: Into<String>>(target: T, message: M) -> Self {
        Self::TransportFailed {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a new non-success status error.
    pub fn non_success<T: Into<String>>(target: T, status: u16) -> Self {
        Self::NonSuccessStatus {
            target: target.into(),
            status,
        }
    }

    /// Create a new body read error.
    pub fn body_read<T: Into<String>, M: Into<String>>(target: T, message: M) -> Self {
        Self::BodyReadFailed {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for errors raised while constructing a request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyAddress | Self::EmptyMethod | Self::MalformedUrl { .. }
        )
    }

    /// True for errors reported through the failure callback.
    pub fn is_execution(&self) -> bool {
        matches!(
            self,
            Self::RequestBuildFailed { .. }
                | Self::TransportFailed { .. }
                | Self::NonSuccessStatus { .. }
                | Self::BodyReadFailed { .. }
        )
    }

    /// The target URL an execution error refers to.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::RequestBuildFailed { target, .. }
            | Self::TransportFailed { target, .. }
            | Self::NonSuccessStatus { target, .. }
            | Self::BodyReadFailed { target, .. } => Some(target),
            _ => None,
        }
    }

    /// HTTP status for `NonSuccessStatus`, `None` otherwise.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::NonSuccessStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for RequesterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyAddress => write!(f, "requester address cannot be empty"),
            Self::EmptyMethod => write!(f, "requester method cannot be empty"),
            Self::MalformedUrl { address, reason } => {
                write!(f, "Malformed URL '{}': {}", address, reason)
            }
            Self::RequestBuildFailed { target, message } => {
                write!(f, "Failed to build request for {}: {}", target, message)
            }
            Self::TransportFailed { target, message } => {
                write!(f, "Request to {} failed: {}", target, message)
            }
            Self::NonSuccessStatus { target, status } => {
                write!(f, "Non-OK HTTP status for {}: {}", target, status)
            }
            Self::BodyReadFailed { target, message } => {
                write!(f, "Failed to read response body from {}: {}", target, message)
            }
            Self::DispatcherClosed => write!(f, "Dispatcher is closed and accepts no new requests"),
            Self::ClientBuildFailed { message } => {
                write!(f, "Failed to create HTTP client: {}", message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
        }
    }
}

impl std::error::Error for RequesterError {}

impl From<toml::de::Error> for RequesterError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            RequesterError::EmptyAddress.to_string(),
            "requester address cannot be empty"
        );
        assert_eq!(
            RequesterError::EmptyMethod.to_string(),
            "requester method cannot be empty"
        );
    }

    #[test]
    fn test_classification() {
        let err = RequesterError::non_success("http://localhost/", 503);
        assert!(err.is_execution());
        assert!(!err.is_validation());
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.target(), Some("http://localhost/"));

        let err = RequesterError::malformed_url("http://", "empty host");
        assert!(err.is_validation());
        assert_eq!(err.target(), None);
        assert_eq!(err.status_code(), None);

        assert!(!RequesterError::DispatcherClosed.is_execution());
        assert!(!RequesterError::DispatcherClosed.is_validation());
    }
}
