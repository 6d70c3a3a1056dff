//! The `Xome` entry point: configuration, default credential, verb helpers.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::client::XomeClient;
use crate::config::XomeConfig;
use crate::error::XomeError;
use crate::http::HttpMethod;
use crate::request::XomeRequest;
use crate::response::XomeResponse;

/// Version of this SDK.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// High-level handle to the Xome API.
///
/// Remembers the default access token and the most recent response.
#[derive(Debug)]
pub struct Xome {
    client: XomeClient,
    default_access_token: Option<String>,
    last_response: Option<Arc<XomeResponse>>,
}

impl Xome {
    pub fn new(config: XomeConfig) -> Result<Self, XomeError> {
        let client = XomeClient::new(
            config.http_client_handler,
            &config.base_uri,
            config.timeout,
            config.headers,
        )?;
        Ok(Self {
            client,
            default_access_token: config.default_access_token,
            last_response: None,
        })
    }

    /// Client configured from `XOME_API_KEY` and `XOME_API_USER`.
    pub fn from_env() -> Result<Self, XomeError> {
        Self::new(XomeConfig::from_env())
    }

    pub fn client(&self) -> &XomeClient {
        &self.client
    }

    pub fn set_default_access_token(&mut self, token: impl Into<String>) {
        self.default_access_token = Some(token.into());
    }

    pub fn default_access_token(&self) -> Option<&str> {
        self.default_access_token.as_deref()
    }

    /// Describe a call without sending it.
    pub fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: BTreeMap<String, Value>,
        access_token: Option<String>,
    ) -> XomeRequest {
        XomeRequest::new(access_token, method, endpoint, params)
    }

    pub fn get(&mut self, endpoint: &str, params: BTreeMap<String, Value>) -> Result<Arc<XomeResponse>, XomeError> {
        self.send_request(HttpMethod::Get, endpoint, params, None)
    }

    pub fn post(&mut self, endpoint: &str, params: BTreeMap<String, Value>) -> Result<Arc<XomeResponse>, XomeError> {
        self.send_request(HttpMethod::Post, endpoint, params, None)
    }

    pub fn put(&mut self, endpoint: &str, params: BTreeMap<String, Value>) -> Result<Arc<XomeResponse>, XomeError> {
        self.send_request(HttpMethod::Put, endpoint, params, None)
    }

    pub fn delete(&mut self, endpoint: &str, params: BTreeMap<String, Value>) -> Result<Arc<XomeResponse>, XomeError> {
        self.send_request(HttpMethod::Delete, endpoint, params, None)
    }

    /// Send a call, using the default access token when `access_token` is
    /// `None` or empty. The response is also kept as [`Xome::last_response`].
    pub fn send_request(
        &mut self,
        method: HttpMethod,
        endpoint: &str,
        params: BTreeMap<String, Value>,
        access_token: Option<String>,
    ) -> Result<Arc<XomeResponse>, XomeError> {
        let access_token = access_token
            .filter(|token| !token.is_empty())
            .or_else(|| self.default_access_token.clone());
        let request = Arc::new(self.request(method, endpoint, params, access_token));
        let response = Arc::new(self.client.send_request(request)?);
        self.last_response = Some(Arc::clone(&response));
        Ok(response)
    }

    /// The response of the most recent successful `send_request`.
    pub fn last_response(&self) -> Option<&Arc<XomeResponse>> {
        self.last_response.as_ref()
    }
}
