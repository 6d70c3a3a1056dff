//! Request builder, transport dispatch and response parser for the Xome API.
//!
//! # Design
//! `XomeClient` carries no mutable state between calls. Each call is split
//! into `build_request`, which turns an `XomeRequest` into an `HttpRequest`,
//! the transport round-trip, and `parse_response`, which turns the
//! `RawResponse` into an `XomeResponse`. The two halves are public so they
//! can be exercised without a network.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::XomeError;
use crate::factory::{create_transport, TransportSelector};
use crate::http::{HttpRequest, RawResponse};
use crate::request::XomeRequest;
use crate::response::XomeResponse;
use crate::transport::{self, HttpTransport};

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("xome-rust-sdk/", env!("CARGO_PKG_VERSION"));

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Synchronous client for the Xome API.
#[derive(Clone)]
pub struct XomeClient {
    transport: Arc<dyn HttpTransport>,
    base_uri: String,
    timeout: Duration,
    default_headers: Vec<(String, String)>,
}

impl fmt::Debug for XomeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XomeClient")
            .field("transport", &self.transport.name())
            .field("base_uri", &self.base_uri)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl XomeClient {
    /// Resolve `selector` and build a client around the resulting transport.
    pub fn new(
        selector: impl Into<TransportSelector>,
        base_uri: &str,
        timeout: Duration,
        default_headers: Vec<(String, String)>,
    ) -> Result<Self, XomeError> {
        let transport = create_transport(selector)?;
        Ok(Self::with_transport(transport, base_uri, timeout, default_headers))
    }

    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        base_uri: &str,
        timeout: Duration,
        default_headers: Vec<(String, String)>,
    ) -> Self {
        Self {
            transport,
            base_uri: base_uri.trim_end_matches('/').to_string(),
            timeout,
            default_headers,
        }
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL for `endpoint`. Endpoints that already carry a scheme are
    /// used unchanged.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!("{}/{}", self.base_uri, endpoint.trim_start_matches('/'))
    }

    /// Turn `request` into the HTTP message a transport sends.
    ///
    /// GET and DELETE carry their parameters in the query string; POST, PUT
    /// and PATCH send them as a form-encoded body.
    pub fn build_request(&self, request: &XomeRequest) -> Result<HttpRequest, XomeError> {
        let encoded = request.url_encoded_params()?;
        let method = request.method();
        let mut url = self.url_for(request.endpoint());

        let mut headers = vec![("User-Agent".to_string(), USER_AGENT.to_string())];
        headers.extend(self.default_headers.iter().cloned());
        if let Some(token) = request.access_token() {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        let body = if method.carries_body() {
            headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));
            Some(encoded)
        } else {
            if !encoded.is_empty() {
                url.push(if url.contains('?') { '&' } else { '?' });
                url.push_str(&encoded);
            }
            None
        };

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Wrap a transport response for `request`.
    pub fn parse_response(&self, request: Arc<XomeRequest>, raw: RawResponse) -> XomeResponse {
        XomeResponse::new(request, raw.body, raw.status, raw.headers)
    }

    /// Send `request` and normalize the result.
    ///
    /// Configuration and transport failures are returned as errors. An API
    /// error is not: it is stored on the returned response.
    pub fn send_request(&self, request: Arc<XomeRequest>) -> Result<XomeResponse, XomeError> {
        let message = self.build_request(&request)?;
        debug!(
            transport = self.transport.name(),
            method = %message.method,
            url = %message.url,
            "sending Xome API request"
        );
        let raw = transport::execute(self.transport.as_ref(), &message, self.timeout)?;
        debug!(
            status = raw.status,
            body_length = raw.body.as_deref().map_or(0, str::len),
            "Xome API response received"
        );
        Ok(self.parse_response(request, raw))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use super::*;
    use crate::error::TransportError;
    use crate::http::HttpMethod;

    /// Records every message and answers with a canned response.
    #[derive(Debug)]
    struct RecordingTransport {
        status: u16,
        body: Option<String>,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingTransport {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: Some(body.to_string()),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    impl HttpTransport for RecordingTransport {
        fn send(
            &self,
            url: &str,
            method: HttpMethod,
            body: Option<&str>,
            headers: &[(String, String)],
            _timeout: Duration,
        ) -> Result<RawResponse, TransportError> {
            self.sent.lock().unwrap().push(HttpRequest {
                method,
                url: url.to_string(),
                headers: headers.to_vec(),
                body: body.map(str::to_string),
            });
            Ok(RawResponse {
                status: self.status,
                headers: vec![("Xome-API-Version".to_string(), "v1.0".to_string())],
                body: self.body.clone(),
            })
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    #[derive(Debug)]
    struct FailingTransport;

    impl HttpTransport for FailingTransport {
        fn send(
            &self,
            _url: &str,
            _method: HttpMethod,
            _body: Option<&str>,
            _headers: &[(String, String)],
            _timeout: Duration,
        ) -> Result<RawResponse, TransportError> {
            Err(TransportError::Timeout)
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn client_with(transport: Arc<dyn HttpTransport>) -> XomeClient {
        XomeClient::with_transport(
            transport,
            "http://localhost:3000/",
            Duration::from_secs(2),
            vec![("Api-Key".to_string(), "key".to_string())],
        )
    }

    fn client() -> XomeClient {
        client_with(RecordingTransport::new(200, "{}"))
    }

    fn request(method: HttpMethod, endpoint: &str, params: Value, token: Option<&str>) -> XomeRequest {
        XomeRequest::new(
            token.map(str::to_string),
            method,
            endpoint,
            serde_json::from_value::<BTreeMap<String, Value>>(params).unwrap(),
        )
    }

    #[test]
    fn build_get_puts_params_in_query() {
        let req = client()
            .build_request(&request(HttpMethod::Get, "/search", json!({"q": "hanoi", "page": 2}), None))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/search?page=2&q=hanoi");
        assert!(req.body.is_none());
        assert_eq!(
            req.headers,
            vec![
                ("User-Agent".to_string(), USER_AGENT.to_string()),
                ("Api-Key".to_string(), "key".to_string()),
            ]
        );
    }

    #[test]
    fn build_get_appends_to_existing_query() {
        let req = client()
            .build_request(&request(HttpMethod::Delete, "listings/1?hard=1", json!({"reason": "sold"}), None))
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/listings/1?hard=1&reason=sold");
    }

    #[test]
    fn build_post_form_encodes_body() {
        let req = client()
            .build_request(&request(
                HttpMethod::Post,
                "/listings",
                json!({"title": "Nhà phố", "price": 100}),
                Some("abc"),
            ))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/listings");
        assert_eq!(req.body.as_deref(), Some("price=100&title=Nh%C3%A0+ph%E1%BB%91"));
        assert!(req
            .headers
            .contains(&("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string())));
        assert!(req
            .headers
            .contains(&("Authorization".to_string(), "Bearer abc".to_string())));
    }

    #[test]
    fn build_put_without_params_sends_empty_body() {
        let req = client()
            .build_request(&request(HttpMethod::Put, "/listings/1", json!({}), None))
            .unwrap();
        assert_eq!(req.body.as_deref(), Some(""));
    }

    #[test]
    fn absolute_endpoints_bypass_base_uri() {
        let c = client();
        assert_eq!(c.url_for("https://api.example.com/x"), "https://api.example.com/x");
        assert_eq!(c.url_for("ping"), "http://localhost:3000/ping");
        assert_eq!(c.base_uri(), "http://localhost:3000");
    }

    #[test]
    fn send_request_round_trip() {
        let transport = RecordingTransport::new(200, r#"{"status":"ok"}"#);
        let c = client_with(transport.clone());
        let req = Arc::new(request(HttpMethod::Get, "/ping", json!({}), None));

        let resp = c.send_request(Arc::clone(&req)).unwrap();
        assert_eq!(resp.http_status_code(), 200);
        assert_eq!(resp.decoded_body()["status"], "ok");
        assert!(!resp.is_error());
        assert!(resp.thrown_exception().is_none());
        assert_eq!(resp.api_version(), Some("v1.0"));
        assert_eq!(resp.request(), req.as_ref());

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "http://localhost:3000/ping");
    }

    #[test]
    fn send_request_keeps_api_errors_on_response() {
        let c = client_with(RecordingTransport::new(400, r#"{"error":{"message":"bad token"}}"#));
        let req = Arc::new(request(HttpMethod::Get, "/me", json!({}), Some("stale")));

        let resp = c.send_request(req).unwrap();
        assert!(resp.is_error());
        let err = resp.thrown_exception().unwrap();
        assert_eq!(err.message(), "bad token");
        assert_eq!(err.request().access_token(), Some("stale"));
        assert!(resp.throw_exception().is_err());
    }

    #[test]
    fn transport_failures_propagate() {
        let c = client_with(Arc::new(FailingTransport));
        let err = c
            .send_request(Arc::new(request(HttpMethod::Get, "/ping", json!({}), None)))
            .unwrap_err();
        assert!(matches!(err, XomeError::Transport(TransportError::Timeout)));
    }

    #[test]
    fn invalid_selector_fails_construction() {
        let err = XomeClient::new("curl", "http://localhost", Duration::from_secs(1), Vec::new()).unwrap_err();
        assert!(matches!(err, XomeError::Configuration(_)));
    }

    #[test]
    fn parse_response_copies_raw_fields() {
        let c = client();
        let raw = RawResponse {
            status: 201,
            headers: vec![("Location".to_string(), "/listings/9".to_string())],
            body: Some("9".to_string()),
        };
        let resp = c.parse_response(Arc::new(request(HttpMethod::Post, "/listings", json!({}), None)), raw);
        assert_eq!(resp.http_status_code(), 201);
        assert_eq!(resp.header("location"), Some("/listings/9"));
        assert_eq!(resp.body(), Some("9"));
        assert_eq!(resp.decoded_body()["id"], 9);
    }
}
