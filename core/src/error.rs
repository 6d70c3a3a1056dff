//! Error types for the Xome API client.
//!
//! # Design
//! Configuration and transport failures are returned immediately through
//! `XomeError`. An API-level failure (a decoded body carrying an `"error"`
//! key) is different: the response is still returned to the caller, with an
//! `ApiError` stored on it. Nothing raises that error until the caller asks
//! for it through `XomeResponse::throw_exception`.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::request::XomeRequest;

/// The transport selector could not be turned into a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The selector named a transport this crate does not know.
    #[error(
        "invalid http client handler {handler:?}: expected \"stream\", \"ureq\", a ureq::Agent or an HttpTransport instance"
    )]
    InvalidHandler { handler: String },

    /// The selector named a transport whose backing library was not compiled in.
    #[error("the {library} library must be enabled in order to use the {handler:?} handler")]
    LibraryUnavailable {
        handler: String,
        library: &'static str,
    },
}

/// The network exchange could not be completed.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("DNS resolution failed: {0}")]
    Dns(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A header name or value cannot be written to the wire as-is.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: u64 },

    /// The peer answered with something that is not an HTTP/1.x response.
    #[error("malformed HTTP response: {0}")]
    MalformedResponse(String),

    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    #[error("transport error: {0}")]
    Other(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout,
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected => TransportError::ConnectionFailed(err.to_string()),
            _ => TransportError::Io(err),
        }
    }
}

/// An error reported by the API inside an otherwise successful exchange.
///
/// Carries the whole response context so callers can inspect it after the
/// fact: status, headers, raw and decoded body, and the originating request.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    code: Option<i64>,
    error_subcode: Option<i64>,
    error_type: Option<String>,
    status: u16,
    headers: Vec<(String, String)>,
    raw_body: Option<String>,
    error: Value,
    decoded_body: Map<String, Value>,
    request: Arc<XomeRequest>,
}

impl ApiError {
    pub(crate) fn new(
        request: Arc<XomeRequest>,
        status: u16,
        headers: Vec<(String, String)>,
        raw_body: Option<String>,
        decoded_body: Map<String, Value>,
    ) -> Self {
        let error = decoded_body.get("error").cloned().unwrap_or(Value::Null);
        let message = match &error {
            Value::String(message) => message.clone(),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error from the Xome API")
                .to_string(),
        };
        Self {
            message,
            code: error.get("code").and_then(Value::as_i64),
            error_subcode: error.get("error_subcode").and_then(Value::as_i64),
            error_type: error.get("type").and_then(Value::as_str).map(str::to_string),
            status,
            headers,
            raw_body,
            error,
            decoded_body,
            request,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The numeric `code` of the error payload, if it has one.
    pub fn code(&self) -> Option<i64> {
        self.code
    }

    pub fn error_subcode(&self) -> Option<i64> {
        self.error_subcode
    }

    /// The `type` of the error payload, if it has one.
    pub fn error_type(&self) -> Option<&str> {
        self.error_type.as_deref()
    }

    pub fn http_status_code(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn raw_body(&self) -> Option<&str> {
        self.raw_body.as_deref()
    }

    /// The value stored under the `"error"` key, passed through untouched.
    pub fn error(&self) -> &Value {
        &self.error
    }

    pub fn decoded_body(&self) -> &Map<String, Value> {
        &self.decoded_body
    }

    pub fn request(&self) -> &XomeRequest {
        &self.request
    }
}

/// Errors returned by fallible client operations.
#[derive(Error, Debug)]
pub enum XomeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The request parameters could not be form-encoded.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// The decoded body could not be deserialized into the requested type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}
