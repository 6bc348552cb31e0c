//! Response builder and wire serialization

use crate::{Response, Result};
use bytes::Bytes;
use http::{header, StatusCode};
use serde::Serialize;
use std::io::Write;

/// Response builder for convenient response construction
#[derive(Debug)]
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(header::HeaderName, String)>,
}

impl ResponseBuilder {
    /// Create a new response builder
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// Set a header
    pub fn header(mut self, name: header::HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Build response with empty body
    pub fn build(self) -> Result<Response> {
        self.body_with(None, Bytes::new())
    }

    /// Build response with text body
    pub fn text(self, body: impl Into<String>) -> Result<Response> {
        self.body_with(Some("text/plain; charset=utf-8"), Bytes::from(body.into()))
    }

    /// Build response with raw bytes and an explicit content type
    pub fn bytes(self, content_type: &str, body: impl Into<Bytes>) -> Result<Response> {
        self.body_with(Some(content_type), body.into())
    }

    /// Build response with JSON body
    pub fn json_body<T: Serialize>(self, body: &T) -> Result<Response> {
        let json = serde_json::to_vec(body)?;
        self.body_with(Some("application/json"), Bytes::from(json))
    }

    fn body_with(self, content_type: Option<&str>, body: Bytes) -> Result<Response> {
        let mut response = http::Response::builder().status(self.status);

        if let Some(content_type) = content_type {
            response = response.header(header::CONTENT_TYPE, content_type);
        }

        for (name, value) in self.headers {
            response = response.header(name, value);
        }

        Ok(response.body(body)?)
    }
}

/// Convenience functions for common responses
pub mod responses {
    use super::*;

    /// 200 OK
    pub fn ok() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::OK)
    }

    /// 201 Created
    pub fn created() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::CREATED)
    }

    /// 204 No Content
    pub fn no_content() -> Result<Response> {
        ResponseBuilder::new(StatusCode::NO_CONTENT).build()
    }

    /// 404 Not Found
    pub fn not_found(message: impl Into<String>) -> Result<Response> {
        ResponseBuilder::new(StatusCode::NOT_FOUND).text(message)
    }

    /// 500 Internal Server Error
    pub fn internal_error(message: impl Into<String>) -> Result<Response> {
        ResponseBuilder::new(StatusCode::INTERNAL_SERVER_ERROR).text(message)
    }
}

/// Serialize a response as HTTP/1.1 onto `out`.
///
/// `content-length` is always derived from the body and every response closes
/// the connection.
pub fn write_response<W: Write + ?Sized>(out: &mut W, response: &Response) -> std::io::Result<()> {
    let status = response.status();
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );

    for (name, value) in response.headers() {
        if *name == header::CONTENT_LENGTH || *name == header::CONNECTION {
            continue;
        }
        head.push_str(name.as_str());
        head.push_str(": ");
        head.push_str(&String::from_utf8_lossy(value.as_bytes()));
        head.push_str("\r\n");
    }

    head.push_str(&format!("content-length: {}\r\n", response.body().len()));
    head.push_str("connection: close\r\n\r\n");

    out.write_all(head.as_bytes())?;
    out.write_all(response.body())?;
    out.flush()
}

/// Write a bodiless response carrying only the status line.
pub fn write_status<W: Write + ?Sized>(out: &mut W, status: StatusCode) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {} {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    out.write_all(head.as_bytes())?;
    out.flush()
}
