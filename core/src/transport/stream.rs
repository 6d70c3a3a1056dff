//! Minimal HTTP/1.1 transport over `std::net::TcpStream`.
//!
//! # Design
//! One connection per request, `Connection: close`, and the body is read
//! until the peer hangs up. That keeps the framing logic down to the two
//! cases a closing server can produce: a `Content-Length` body or a chunked
//! one. There is no TLS, so only `http://` URLs are accepted.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use tracing::debug;
use url::{Position, Url};

use super::{validate_headers, HttpTransport, MAX_BODY_BYTES};
use crate::error::TransportError;
use crate::http::{find_header, HttpMethod, RawResponse};

/// Room for the status line, headers and chunk framing on top of the body.
const MAX_HEAD_BYTES: u64 = 64 * 1024;

/// Built-in transport with no dependency beyond the standard library's sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamTransport;

impl StreamTransport {
    pub fn new() -> Self {
        Self
    }
}

impl HttpTransport for StreamTransport {
    fn send(
        &self,
        url: &str,
        method: HttpMethod,
        body: Option<&str>,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        let url = Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))?;
        match url.scheme() {
            "http" => {}
            "https" => {
                return Err(TransportError::Tls(
                    "the stream transport does not support https; use the ureq transport".to_string(),
                ))
            }
            other => return Err(TransportError::InvalidUrl(format!("unsupported scheme {other:?}"))),
        }
        validate_headers(headers)?;

        // Bracketed for IPv6 literals, which is the form `Host:` wants.
        let host = url
            .host_str()
            .ok_or_else(|| TransportError::InvalidUrl(format!("{url}: missing host")))?;
        let addrs = url
            .socket_addrs(|| Some(80))
            .map_err(|e| TransportError::Dns(format!("{host}: {e}")))?;
        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);

        let mut stream = connect(host, &addrs, deadline)?;

        let host_header = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let target = &url[Position::BeforePath..Position::AfterQuery];
        let message = encode_request(method, target, &host_header, headers, body);
        stream.set_write_timeout(remaining(deadline)?)?;
        stream.write_all(&message)?;
        stream.flush()?;

        let raw = read_to_close(&mut stream, deadline, MAX_BODY_BYTES)?;
        debug!(bytes = raw.len(), "stream transport read response");
        parse_response(&raw, MAX_BODY_BYTES)
    }

    fn name(&self) -> &'static str {
        "stream"
    }
}

/// Time left before `deadline`, or `Timeout` once it has passed.
fn remaining(deadline: Option<Instant>) -> Result<Option<Duration>, TransportError> {
    let Some(deadline) = deadline else {
        return Ok(None);
    };
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(TransportError::Timeout);
    }
    Ok(Some(left))
}

fn connect(host: &str, addrs: &[SocketAddr], deadline: Option<Instant>) -> Result<TcpStream, TransportError> {
    if addrs.is_empty() {
        return Err(TransportError::Dns(format!("{host}: no addresses found")));
    }

    let mut last_err = None;
    for addr in addrs {
        let attempt = match remaining(deadline)? {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.map_or_else(
        || TransportError::ConnectionFailed(host.to_string()),
        TransportError::from,
    ))
}

/// Read until the peer closes, bounded by `deadline` for the whole exchange
/// rather than per read.
fn read_to_close(
    stream: &mut TcpStream,
    deadline: Option<Instant>,
    body_limit: u64,
) -> Result<Vec<u8>, TransportError> {
    let cap = body_limit.saturating_add(MAX_HEAD_BYTES);
    let mut raw = Vec::new();
    let mut buf = [0u8; 8 * 1024];
    loop {
        stream.set_read_timeout(remaining(deadline)?)?;
        let n = match stream.read(&mut buf) {
            Ok(0) => return Ok(raw),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if (raw.len() + n) as u64 > cap {
            return Err(TransportError::BodyTooLarge { limit: body_limit });
        }
        raw.extend_from_slice(&buf[..n]);
    }
}

fn encode_request(
    method: HttpMethod,
    target: &str,
    host: &str,
    headers: &[(String, String)],
    body: Option<&str>,
) -> Vec<u8> {
    let mut head = format!("{method} {target} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n");
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    let body = body.unwrap_or_default();
    if !body.is_empty() || method.carries_body() {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("\r\n");

    let mut message = head.into_bytes();
    message.extend_from_slice(body.as_bytes());
    message
}

/// Parse a complete HTTP/1.x response read up to connection close.
///
/// Header names are lowercased. A body longer than `body_limit` is refused.
fn parse_response(raw: &[u8], body_limit: u64) -> Result<RawResponse, TransportError> {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| TransportError::MalformedResponse("missing end of headers".to_string()))?;
    let head = String::from_utf8_lossy(&raw[..split]);
    let rest = &raw[split + 4..];

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(TransportError::MalformedResponse(format!("bad status line {status_line:?}")));
    }
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| TransportError::MalformedResponse(format!("bad status line {status_line:?}")))?;

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let chunked = find_header(&headers, "transfer-encoding")
        .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));
    let body = if chunked {
        decode_chunked(rest)?
    } else if let Some(length) = find_header(&headers, "content-length") {
        let length: usize = length
            .parse()
            .map_err(|_| TransportError::MalformedResponse(format!("bad content-length {length:?}")))?;
        if length as u64 > body_limit {
            return Err(TransportError::BodyTooLarge { limit: body_limit });
        }
        rest.get(..length)
            .ok_or_else(|| TransportError::MalformedResponse("body shorter than content-length".to_string()))?
            .to_vec()
    } else {
        rest.to_vec()
    };
    if body.len() as u64 > body_limit {
        return Err(TransportError::BodyTooLarge { limit: body_limit });
    }

    Ok(RawResponse {
        status,
        headers,
        body: Some(String::from_utf8_lossy(&body).into_owned()),
    })
}

fn decode_chunked(mut rest: &[u8]) -> Result<Vec<u8>, TransportError> {
    let malformed = || TransportError::MalformedResponse("bad chunked encoding".to_string());
    let mut body = Vec::new();
    loop {
        let line_end = rest.windows(2).position(|w| w == b"\r\n").ok_or_else(malformed)?;
        let size_line = std::str::from_utf8(&rest[..line_end]).map_err(|_| malformed())?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16).map_err(|_| malformed())?;
        rest = &rest[line_end + 2..];
        if size == 0 {
            return Ok(body);
        }
        let chunk = rest.get(..size).ok_or_else(malformed)?;
        body.extend_from_slice(chunk);
        rest = rest.get(size + 2..).ok_or_else(malformed)?;
    }
}
