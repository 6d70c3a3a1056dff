//! The capability every HTTP engine adapter provides.
//!
//! # Design
//! A transport is a pipe: it takes a fully prepared message and returns the
//! status, headers and body it got back. It never looks inside the payload,
//! and HTTP error statuses come back as data. Only failures to complete the
//! exchange (DNS, connect, TLS, timeout, garbage on the wire) are errors.
//!
//! `StreamTransport` is always available. `UreqTransport` is compiled in with
//! the `ureq` feature. Both report the same `RawResponse` shape and map their
//! failures onto the same `TransportError` variants. Response header names
//! come back lowercase and bodies are capped at `MAX_BODY_BYTES`. Outgoing
//! headers are checked before any connection is made.

use std::fmt;
use std::time::Duration;

use ::http::{HeaderName, HeaderValue};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, RawResponse};

mod stream;
#[cfg(feature = "ureq")]
mod ureq;

pub use stream::StreamTransport;
#[cfg(feature = "ureq")]
pub use self::ureq::UreqTransport;

/// Largest response body a transport accepts, in bytes.
pub const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

/// Sends one HTTP request and returns the unprocessed response.
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Execute the exchange, blocking until it completes, fails or `timeout`
    /// elapses. A zero `timeout` disables the deadline.
    fn send(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<&str>,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

/// Send a prepared `HttpRequest` through `transport`.
pub fn execute(
    transport: &dyn HttpTransport,
    request: &HttpRequest,
    timeout: Duration,
) -> Result<RawResponse, TransportError> {
    transport.send(
        &request.url,
        request.method,
        request.body.as_deref(),
        &request.headers,
        timeout,
    )
}

/// Reject header names and values that are not valid HTTP field syntax,
/// such as values carrying CR, LF or NUL.
pub(crate) fn validate_headers(headers: &[(String, String)]) -> Result<(), TransportError> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TransportError::InvalidHeader(format!("bad header name {name:?}")))?;
        HeaderValue::from_str(value)
            .map_err(|_| TransportError::InvalidHeader(format!("bad value for header {name:?}")))?;
    }
    Ok(())
}
