//! Validated request values.
//!
//! A [`Request`] is checked completely when it is built, so anything that
//! reaches the dispatcher queue already has an absolute target URL and a
//! non-empty method.

use crate::error::RequesterError;
use crate::utils::{is_blank, with_default_scheme};
use reqwest::Url;

/// One HTTP call to be executed by the dispatcher.
///
/// # Example
///
/// ```rust
/// use requester_lib::Request;
///
/// let request = Request::new("example.com", "GET", "").unwrap();
/// assert_eq!(request.target().scheme(), "http");
/// assert_eq!(request.method(), "GET");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    target: Url,
    method: String,
    body: String,
}

impl Request {
    /// Build and validate a request.
    ///
    /// The address is trimmed and gets an `http://` prefix when it names no
    /// scheme. No network activity happens here.
    ///
    /// # Errors
    ///
    /// - `EmptyAddress` if the trimmed address is empty
    /// - `EmptyMethod` if the trimmed method is empty
    /// - `MalformedUrl` if the address does not parse as an absolute URL with a host
    pub fn new(address: &str, method: &str, body: &str) -> Result<Self, RequesterError> {
        let address = address.trim();

        if is_blank(address) {
            return Err(RequesterError::EmptyAddress);
        }
        if is_blank(method) {
            return Err(RequesterError::EmptyMethod);
        }

        let address = with_default_scheme(address);
        let target = Url::parse(&address)
            .map_err(|e| RequesterError::malformed_url(address.as_str(), e.to_string()))?;

        if target.host().is_none() {
            return Err(RequesterError::malformed_url(address, "URL has no host"));
        }

        Ok(Self {
            target,
            method: method.trim().to_string(),
            body: body.to_string(),
        })
    }

    /// Shorthand for a body-less GET.
    pub fn get(address: &str) -> Result<Self, RequesterError> {
        Self::new(address, "GET", "")
    }

    /// Absolute target URL.
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// HTTP verb, as supplied (trimmed).
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request payload; empty means no body.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.target)
    }
}
