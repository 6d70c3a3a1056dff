//! One outbound call to the Xome API.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::XomeError;
use crate::http::HttpMethod;

/// An immutable description of a single API call.
///
/// Created per call and shared with the resulting `XomeResponse`. A retry
/// needs a new request.
#[derive(Debug, Clone, PartialEq)]
pub struct XomeRequest {
    access_token: Option<String>,
    method: HttpMethod,
    endpoint: String,
    params: BTreeMap<String, Value>,
}

impl XomeRequest {
    pub fn new(
        access_token: Option<String>,
        method: HttpMethod,
        endpoint: impl Into<String>,
        params: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            access_token,
            method,
            endpoint: endpoint.into(),
            params,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// Serialize the parameters as `application/x-www-form-urlencoded`.
    ///
    /// Strings are sent verbatim, other scalars in their JSON spelling, `null`
    /// as an empty value, and arrays or objects as JSON text.
    pub fn url_encoded_params(&self) -> Result<String, XomeError> {
        let pairs: Vec<(&str, String)> = self
            .params
            .iter()
            .map(|(key, value)| (key.as_str(), form_value(value)))
            .collect();
        serde_urlencoded::to_string(pairs).map_err(|e| XomeError::Encoding(e.to_string()))
    }
}

fn form_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
