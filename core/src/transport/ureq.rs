//! Transport backed by the `ureq` HTTP engine.

use std::fmt;
use std::io;
use std::time::Duration;

use ureq::{Agent, RequestBuilder};

use super::{validate_headers, HttpTransport, MAX_BODY_BYTES};
use crate::error::TransportError;
use crate::http::{HttpMethod, RawResponse};

/// Full-featured transport: TLS, proxies and connection reuse come from `ureq`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Wrap an agent the caller already configured.
    ///
    /// Status-as-error and the timeout are still overridden per request so
    /// the transport contract holds.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl HttpTransport for UreqTransport {
    fn send(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<&str>,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        validate_headers(headers)?;
        let result = match (method, body) {
            (HttpMethod::Get, _) => prepare(self.agent.get(url), headers, timeout).call(),
            (HttpMethod::Delete, _) => prepare(self.agent.delete(url), headers, timeout).call(),
            (HttpMethod::Post, Some(body)) => {
                prepare(self.agent.post(url), headers, timeout).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => prepare(self.agent.post(url), headers, timeout).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                prepare(self.agent.put(url), headers, timeout).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => prepare(self.agent.put(url), headers, timeout).send_empty(),
            (HttpMethod::Patch, Some(body)) => {
                prepare(self.agent.patch(url), headers, timeout).send(body.as_bytes())
            }
            (HttpMethod::Patch, None) => prepare(self.agent.patch(url), headers, timeout).send_empty(),
        };
        let mut response = result.map_err(map_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        // ureq fails on the first read after `limit` bytes, even at EOF, so a
        // body of exactly MAX_BODY_BYTES needs one byte of headroom.
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES + 1)
            .read_to_vec()
            .map_err(map_error)?;

        Ok(RawResponse {
            status,
            headers,
            body: Some(String::from_utf8_lossy(&body).into_owned()),
        })
    }

    fn name(&self) -> &'static str {
        "ureq"
    }
}

fn prepare<B>(
    mut builder: RequestBuilder<B>,
    headers: &[(String, String)],
    timeout: Duration,
) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .config()
        .http_status_as_error(false)
        .timeout_global((!timeout.is_zero()).then_some(timeout))
        .build()
}

fn map_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::HostNotFound => TransportError::Dns("host not found".to_string()),
        ureq::Error::ConnectionFailed => {
            TransportError::ConnectionFailed("connection failed".to_string())
        }
        ureq::Error::BadUri(uri) => TransportError::InvalidUrl(uri),
        ureq::Error::BodyExceedsLimit(_) => TransportError::BodyTooLarge { limit: MAX_BODY_BYTES },
        ureq::Error::Tls(reason) => TransportError::Tls(reason.to_string()),
        ureq::Error::TlsRequired => TransportError::Tls("TLS required".to_string()),
        ureq::Error::Rustls(e) => TransportError::Tls(e.to_string()),
        ureq::Error::Io(e) if is_tls_failure(&e) => TransportError::Tls(e.to_string()),
        ureq::Error::Io(e) => TransportError::from(e),
        other => TransportError::Other(other.to_string()),
    }
}

/// Handshake failures surface from rustls as I/O errors wrapping a `rustls::Error`.
fn is_tls_failure(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<rustls::Error>())
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;
    use crate::http::find_header;

    /// Accept one connection, read whatever the client sends first and answer
    /// with `response`.
    fn serve_once(response: Vec<u8>) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf);
            let _ = socket.write_all(&response);
        });
        addr
    }

    #[test]
    fn error_status_is_returned_as_data() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).unwrap();
            socket
                .write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"error\":1}")
                .unwrap();
        });

        let resp = UreqTransport::new()
            .send(&format!("http://{addr}/fail"), HttpMethod::Get, None, &[], Duration::from_secs(5))
            .unwrap();
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body.as_deref(), Some("{\"error\":1}"));
        assert_eq!(find_header(&resp.headers, "Content-Length"), Some("11"));
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = UreqTransport::new()
            .send(&format!("http://127.0.0.1:{port}/"), HttpMethod::Get, None, &[], Duration::from_secs(1))
            .unwrap_err();
        assert!(
            matches!(
                err,
                TransportError::ConnectionFailed(_) | TransportError::Io(_) | TransportError::Other(_)
            ),
            "{err:?}"
        );
    }

    #[test]
    fn name_identifies_engine() {
        assert_eq!(UreqTransport::default().name(), "ureq");
    }

    #[test]
    fn header_names_are_lowercase() {
        let addr = serve_once(b"HTTP/1.1 200 OK\r\nXome-API-Version: v1.0\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}".to_vec());
        let resp = UreqTransport::new()
            .send(&format!("http://{addr}/ping"), HttpMethod::Get, None, &[], Duration::from_secs(5))
            .unwrap();
        assert!(resp.headers.iter().any(|(name, value)| name == "xome-api-version" && value == "v1.0"));
        assert!(resp.headers.iter().all(|(name, _)| *name == name.to_ascii_lowercase()));
    }

    #[test]
    fn handshake_against_plaintext_server_is_a_tls_error() {
        let addr = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n".to_vec());
        let err = UreqTransport::new()
            .send(&format!("https://localhost:{}/", addr.port()), HttpMethod::Get, None, &[], Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, TransportError::Tls(_)), "{err:?}");
    }

    #[test]
    fn header_injection_is_refused() {
        let headers = vec![("Authorization".to_string(), "Bearer x\r\nX-Injected: evil".to_string())];
        let err = UreqTransport::new()
            .send("http://127.0.0.1:9/ping", HttpMethod::Get, None, &headers, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidHeader(_)), "{err:?}");
    }

    #[test]
    fn body_at_limit_is_accepted_and_one_more_byte_is_refused() {
        for (length, accepted) in [(MAX_BODY_BYTES as usize, true), (MAX_BODY_BYTES as usize + 1, false)] {
            let mut response =
                format!("HTTP/1.1 200 OK\r\nContent-Length: {length}\r\nConnection: close\r\n\r\n").into_bytes();
            response.resize(response.len() + length, b'a');
            let addr = serve_once(response);

            let result = UreqTransport::new().send(
                &format!("http://{addr}/large"),
                HttpMethod::Get,
                None,
                &[],
                Duration::from_secs(10),
            );
            if accepted {
                assert_eq!(result.unwrap().body.map(|b| b.len()), Some(length));
            } else {
                let err = result.unwrap_err();
                assert!(matches!(err, TransportError::BodyTooLarge { limit: MAX_BODY_BYTES }), "{err:?}");
            }
        }
    }
}
