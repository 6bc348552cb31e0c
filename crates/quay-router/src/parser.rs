//! HTTP/1.x request parsing
//!
//! The engine hands the router whatever its first read returned. The parser
//! keeps reading from the stream until the head is complete and the declared
//! body has arrived, with every buffer taken from the connection's scope.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{Method, Version};
use quay_core::{ConnectionScope, Error, Request, Result, Stream};

/// Limits applied while reading a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Maximum size of the request line plus headers
    pub max_head: usize,

    /// Maximum declared body length
    pub max_body: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_head: 8 * 1024,
            max_body: 1024 * 1024,
        }
    }
}

/// Read one request from `stream`, starting with the bytes already in `initial`.
pub fn read_request(
    scope: &mut ConnectionScope,
    stream: &mut dyn Stream,
    initial: &[u8],
    limits: &ParseLimits,
) -> Result<Request> {
    let mut data = scope.alloc(limits.max_head.max(initial.len()));
    data[..initial.len()].copy_from_slice(initial);
    let mut filled = initial.len();

    let head_end = loop {
        if let Some(end) = find_head_end(&data[..filled]) {
            break end;
        }
        if filled >= limits.max_head {
            return Err(Error::TooLarge {
                what: "request head",
                limit: limits.max_head,
            });
        }
        let n = stream.read(&mut data[filled..limits.max_head])?;
        if n == 0 {
            return Err(Error::InvalidRequest(
                "connection closed before end of request head".to_string(),
            ));
        }
        filled += n;
    };

    let mut request = parse_head(&data[..head_end])?;

    let body_len = content_length(&request)?;
    if body_len > limits.max_body {
        return Err(Error::TooLarge {
            what: "request body",
            limit: limits.max_body,
        });
    }

    if body_len > 0 {
        let mut body = scope.alloc(body_len);
        let buffered = (filled - head_end).min(body_len);
        body[..buffered].copy_from_slice(&data[head_end..head_end + buffered]);
        stream.read_exact(&mut body[buffered..]).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::InvalidRequest("connection closed before end of body".to_string())
            } else {
                Error::Io(e)
            }
        })?;
        *request.body_mut() = body.freeze();
    }

    Ok(request)
}

/// Offset just past the blank line terminating the head
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

fn parse_head(head: &[u8]) -> Result<Request> {
    let text = std::str::from_utf8(head)
        .map_err(|_| Error::InvalidRequest("request head is not valid UTF-8".to_string()))?;

    let mut lines = text.split("\r\n");
    let request_line = lines.next().unwrap_or_default();

    let mut parts = request_line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::InvalidRequest(format!(
            "malformed request line: {request_line:?}"
        )));
    };

    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| Error::InvalidRequest(format!("invalid method: {method}")))?;

    let version = match version {
        "HTTP/1.1" => Version::HTTP_11,
        "HTTP/1.0" => Version::HTTP_10,
        other => {
            return Err(Error::InvalidRequest(format!(
                "unsupported protocol version: {other}"
            )))
        }
    };

    let mut builder = http::Request::builder()
        .method(method)
        .uri(target)
        .version(version);

    for line in lines.take_while(|line| !line.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidRequest(format!("malformed header: {line:?}")))?;

        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidRequest(format!("invalid header name: {name:?}")))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| Error::InvalidRequest(format!("invalid value for header {name}")))?;

        builder = builder.header(name, value);
    }

    builder
        .body(Bytes::new())
        .map_err(|e| Error::InvalidRequest(e.to_string()))
}

fn content_length(request: &Request) -> Result<usize> {
    if request.headers().contains_key(TRANSFER_ENCODING) {
        return Err(Error::InvalidRequest(
            "transfer-encoding is not supported".to_string(),
        ));
    }

    match request.headers().get(CONTENT_LENGTH) {
        None => Ok(0),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .ok_or_else(|| Error::InvalidRequest("invalid content-length".to_string())),
    }
}
