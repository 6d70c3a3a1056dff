//! Synchronous client for the Xome JSON/HTTP API.
//!
//! # Overview
//! Builds outbound requests, sends them through a pluggable transport, and
//! folds whatever the server answers (JSON objects, form-encoded pairs, bare
//! booleans or numbers, nothing at all) into one `XomeResponse` shape whose
//! decoded body is always a JSON object.
//!
//! # Design
//! - `HttpTransport` is the only seam to the network. `StreamTransport`
//!   speaks plain HTTP/1.1 over a socket; `UreqTransport` (feature `ureq`,
//!   on by default) wraps the `ureq` engine.
//! - `create_transport` picks a transport from a `TransportSelector`.
//! - `XomeClient` splits each call into `build_request`, the transport
//!   round-trip, and `parse_response`, so both halves test without I/O.
//! - An `"error"` key in a decoded body produces an `ApiError` that is
//!   stored on the response and only raised on request.
//! - `Xome` adds configuration, the default access token, verb helpers and
//!   the last-response slot.

pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod http;
pub mod request;
pub mod response;
pub mod transport;
pub mod xome;

pub use client::XomeClient;
pub use config::XomeConfig;
pub use error::{ApiError, ConfigurationError, TransportError, XomeError};
pub use factory::{create_transport, TransportSelector};
pub use http::{HttpMethod, HttpRequest, RawResponse};
pub use request::XomeRequest;
pub use response::{decode_body, XomeResponse};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use transport::{HttpTransport, StreamTransport};
pub use xome::Xome;
