//! # Transports
//!
//! The resource model never talks to the network directly. Every request goes through a
//! [`Transport`], which makes it easy to swap the real HTTP client for in-memory routes
//! in tests or for recorded exchanges on disk.
//!
//! A response with any status is a successful exchange; only failures to perform the
//! exchange at all are [`TransportError`]s.
#[cfg(feature = "http")]
pub mod http;
pub mod mock;
pub mod playback;

use std::borrow::Cow;
use std::path::PathBuf;

use ::http::header::{HeaderName, HeaderValue};
use ::http::{HeaderMap, Method, StatusCode};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "http")]
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Malformed recording at {path}: {reason}")]
    Recording { path: PathBuf, reason: String },
}

/// A request to issue against a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub uri: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, uri: Url) -> Self {
        Request {
            method,
            uri,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// The response to a [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Response {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Add a header, ignoring names or values that are not valid in HTTP.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Whether the status is in the `2xx` range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The first value of header `name`, looked up case-insensitively. Values that are
    /// not visible ASCII are treated as missing.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body, decoded as UTF-8 with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Something that can perform HTTP exchanges.
pub trait Transport: Send + Sync {
    fn request(&self, request: Request) -> Result<Response, TransportError>;

    /// Credentials to present to servers that ask for them.
    fn add_credentials(&self, _name: &str, _password: &str) {}
}
