/*
 * request.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Wirehttp, an HTTP/1.1 client library.
 *
 * Wirehttp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wirehttp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wirehttp.  If not, see <http://www.gnu.org/licenses/>.
 */

//! HTTP request: method, target URI, headers, optional body, send options, and the terminal
//! state filled in by the client (response or error, elapsed time).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::protocol::http::cookie_jar::CookieJar;
use crate::protocol::http::error::HttpError;
use crate::protocol::http::headers::Headers;
use crate::protocol::http::response::{ChunkQueue, Response};
use crate::uri::Uri;

pub const DEFAULT_MAXIMUM_RETRY_COUNT: u32 = 8;
pub const DEFAULT_PROTOCOL: &str = "HTTP/1.1";

/// HTTP request method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Other(s) => s,
        }
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => Method::Other(other.to_string()),
        }
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Method::from(s))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Waiting,
    Reading,
    Done,
}

/// Which cookie jar a request reads from and writes `Set-Cookie` into.
#[derive(Debug, Clone, Default)]
pub enum CookieJarChoice {
    /// The sending client's jar.
    #[default]
    ClientDefault,
    Jar(Arc<CookieJar>),
    Disabled,
}

#[derive(Debug)]
pub struct Request {
    pub method: Method,
    uri: Uri,
    pub protocol: String,
    headers: Headers,
    pub body: Option<Bytes>,
    /// Upper bound on connection attempts per send, redirects included.
    pub maximum_retry_count: u32,
    pub accept_gzip: bool,
    /// Use and update the client's ETag cache.
    pub use_cache: bool,
    /// Run on the caller's thread and call back inline (see `HttpClient::send_with_callback`).
    pub synchronous: bool,
    pub cookie_jar: CookieJarChoice,

    pub(crate) state: RequestState,
    pub(crate) response: Option<Response>,
    pub(crate) error: Option<HttpError>,
    pub(crate) response_time: Duration,
    chunks: ChunkQueue,
}

impl Request {
    pub fn new(method: impl Into<Method>, uri: &str) -> Result<Self, HttpError> {
        Ok(Self::with_uri(method.into(), Uri::parse(uri)?))
    }

    pub fn with_uri(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            protocol: DEFAULT_PROTOCOL.to_string(),
            headers: Headers::new(),
            body: None,
            maximum_retry_count: DEFAULT_MAXIMUM_RETRY_COUNT,
            accept_gzip: true,
            use_cache: false,
            synchronous: false,
            cookie_jar: CookieJarChoice::default(),
            state: RequestState::Waiting,
            response: None,
            error: None,
            response_time: Duration::ZERO,
            chunks: ChunkQueue::new(),
        }
    }

    pub fn get(uri: &str) -> Result<Self, HttpError> {
        Self::new(Method::Get, uri)
    }

    pub fn post(uri: &str, body: impl Into<Bytes>) -> Result<Self, HttpError> {
        let mut request = Self::new(Method::Post, uri)?;
        request.body = Some(body.into());
        Ok(request)
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Retarget the request; used by the client when following a redirect.
    pub fn set_uri(&mut self, uri: Uri) {
        self.uri = uri;
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn add_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers.add(name, value);
        self
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers.set(name, value);
        self
    }

    pub fn header(&self, name: &str) -> &str {
        self.headers.get(name)
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// UTF-8 text body.
    pub fn set_text(&mut self, text: &str) -> &mut Self {
        self.set_body(Bytes::copy_from_slice(text.as_bytes()))
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == RequestState::Done
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    pub fn error(&self) -> Option<&HttpError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<HttpError> {
        self.error.take()
    }

    pub fn response_time(&self) -> Duration {
        self.response_time
    }

    /// Handle on the chunk queue of the response currently being read. Clone it before sending
    /// a chunked request to consume chunks while the body is still arriving.
    pub fn chunks(&self) -> ChunkQueue {
        self.chunks.clone()
    }

    /// Forget the previous send's outcome.
    pub(crate) fn reset(&mut self) {
        self.state = RequestState::Waiting;
        self.response = None;
        self.error = None;
        self.response_time = Duration::ZERO;
        self.chunks.reset();
    }

    /// Request line, headers, blank line, body.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let body_len = self.body.as_ref().map_or(0, |b| b.len());
        let mut out = Vec::with_capacity(256 + body_len);
        out.extend_from_slice(
            format!(
                "{} {} {}\r\n",
                self.method.as_str().to_ascii_uppercase(),
                self.uri.path_and_query(),
                self.protocol
            )
            .as_bytes(),
        );
        for (name, value) in self.headers.iter() {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        if let Some(body) = &self.body {
            out.extend_from_slice(body);
        }
        out
    }

    /// One-line exchange summary; `verbose` appends headers and body text.
    pub fn info_string(&self, verbose: bool) -> String {
        let done = self.is_done();
        let response = self.response.as_ref().filter(|_| done);
        let status = response.map_or("---".to_string(), |r| r.status.to_string());
        let message = response.map_or("Unknown", |r| r.message.as_str());
        let size = response.map_or(0, |r| r.body().len());

        let mut out = format!(
            "{} [ {} ] [ {} {} ] [ {} ] [ {}ms ]",
            self.uri,
            self.method.as_str().to_ascii_uppercase(),
            status,
            message,
            format_size(size),
            self.response_time.as_millis()
        );
        if let (true, Some(r)) = (verbose, response) {
            out.push_str("\n\nRequest Headers:\n\n");
            out.push_str(&self.headers.all_entries().join("\n"));
            out.push_str("\n\nResponse Headers:\n\n");
            out.push_str(&r.headers().all_entries().join("\n"));
            out.push_str("\n\nResponse Body:\n");
            out.push_str(&r.text());
        }
        out
    }
}

/// `1536` -> `1.5KB`; at most two decimals, trailing zeros dropped.
fn format_size(len: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = len as f64;
    let mut order = 0;
    while size >= 1024.0 && order + 1 < UNITS.len() {
        order += 1;
        size /= 1024.0;
    }
    let mut n = format!("{:.2}", size);
    if n.contains('.') {
        n = n.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("{}{}", n, UNITS[order])
}
