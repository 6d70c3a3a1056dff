//! Normalized responses from the Xome API.
//!
//! # Design
//! The API is inconsistent about what it sends back: JSON objects for most
//! calls, form-encoded pairs from the legacy token exchange endpoint, and
//! bare booleans, numbers or nothing at all from some simple calls.
//! `decode_body` folds every one of those shapes into a JSON object so
//! callers always see the same `Map<String, Value>`.
//!
//! An `"error"` key in the decoded body marks an API failure. The response
//! then carries a ready-made `ApiError`, but stays an ordinary value: the
//! caller decides whether to raise it.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ApiError, XomeError};
use crate::http::find_header;
use crate::request::XomeRequest;

/// Header carrying the version of the API that served a response.
pub const API_VERSION_HEADER: &str = "Xome-API-Version";

/// A transport response with its body decoded and API errors detected.
#[derive(Debug, Clone)]
pub struct XomeResponse {
    request: Arc<XomeRequest>,
    http_status_code: u16,
    headers: Vec<(String, String)>,
    body: Option<String>,
    decoded_body: Map<String, Value>,
    thrown_exception: Option<ApiError>,
}

impl XomeResponse {
    pub fn new(
        request: Arc<XomeRequest>,
        body: Option<String>,
        http_status_code: u16,
        headers: Vec<(String, String)>,
    ) -> Self {
        let decoded_body = decode_body(body.as_deref());
        let thrown_exception = is_error_body(&decoded_body).then(|| {
            let err = ApiError::new(
                Arc::clone(&request),
                http_status_code,
                headers.clone(),
                body.clone(),
                decoded_body.clone(),
            );
            warn!(
                status = http_status_code,
                endpoint = request.endpoint(),
                message = err.message(),
                "Xome API returned an error"
            );
            err
        });
        Self {
            request,
            http_status_code,
            headers,
            body,
            decoded_body,
            thrown_exception,
        }
    }

    pub fn request(&self) -> &XomeRequest {
        &self.request
    }

    /// The credential the originating request was sent with.
    pub fn access_token(&self) -> Option<&str> {
        self.request.access_token()
    }

    pub fn http_status_code(&self) -> u16 {
        self.http_status_code
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive lookup of a response header.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn decoded_body(&self) -> &Map<String, Value> {
        &self.decoded_body
    }

    /// Version of the API that served this response, if the server said.
    pub fn api_version(&self) -> Option<&str> {
        self.header(API_VERSION_HEADER)
    }

    pub fn is_error(&self) -> bool {
        is_error_body(&self.decoded_body)
    }

    /// The error materialized for this response, if any. Never raised implicitly.
    pub fn thrown_exception(&self) -> Option<&ApiError> {
        self.thrown_exception.as_ref()
    }

    /// Raise the stored API error.
    ///
    /// Returns `Ok(())` when the response carried no error.
    pub fn throw_exception(&self) -> Result<(), ApiError> {
        match &self.thrown_exception {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Consume the response, raising the stored API error if there is one.
    pub fn into_result(self) -> Result<Self, ApiError> {
        match self.thrown_exception {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    /// Deserialize the decoded body into a caller-defined type.
    pub fn decode_into<T: DeserializeOwned>(&self) -> Result<T, XomeError> {
        serde_json::from_value(Value::Object(self.decoded_body.clone()))
            .map_err(|e| XomeError::Deserialization(e.to_string()))
    }
}

/// Normalize a raw body into a JSON object.
///
/// - A JSON object is used as-is.
/// - A body that is not JSON, or is JSON `null`, is read as form-encoded pairs.
/// - `true`/`false` become `{"success": bool}`.
/// - A number, or a string holding a numeric literal, becomes `{"id": value}`.
/// - Anything else (other strings, arrays) becomes an empty object.
pub fn decode_body(body: Option<&str>) -> Map<String, Value> {
    let raw = body.unwrap_or_default();
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(Value::Null) | Err(_) => decode_form(raw),
        Ok(Value::Bool(success)) => single("success", Value::Bool(success)),
        Ok(Value::Number(id)) => single("id", Value::Number(id)),
        Ok(Value::String(s)) if is_numeric(&s) => single("id", Value::String(s)),
        Ok(Value::String(_)) | Ok(Value::Array(_)) => Map::new(),
    }
}

fn decode_form(raw: &str) -> Map<String, Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).unwrap_or_default();
    let mut map = Map::new();
    for (key, value) in pairs {
        if key.trim().is_empty() {
            continue;
        }
        map.insert(key, Value::String(value));
    }
    map
}

fn single(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}

/// Accepts decimal integers, decimals and exponent notation, with optional
/// surrounding whitespace and sign.
fn is_numeric(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && trimmed.parse::<f64>().is_ok()
}

fn is_error_body(decoded: &Map<String, Value>) -> bool {
    decoded.get("error").is_some_and(|error| !error.is_null())
}
