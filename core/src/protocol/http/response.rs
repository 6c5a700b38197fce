/*
 * response.rs
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

//! HTTP response: status, headers, decoded body, and the chunk queue a consumer may drain while a
//! chunked body is still being read.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::protocol::http::cookie::Cookie;
use crate::protocol::http::cookie_jar::CookieJar;
use crate::protocol::http::error::ProtocolError;
use crate::protocol::http::headers::Headers;
use crate::uri::Uri;

#[derive(Debug, Default)]
struct ChunkQueueInner {
    chunks: Mutex<VecDeque<Bytes>>,
    finished: AtomicBool,
}

/// Raw chunks of a chunked body, in arrival order, guarded by their own lock.
///
/// Cloning yields another handle on the same queue.
#[derive(Debug, Clone, Default)]
pub struct ChunkQueue {
    inner: Arc<ChunkQueueInner>,
}

impl ChunkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, chunk: Bytes) {
        self.inner
            .chunks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(chunk);
    }

    pub(crate) fn finish(&self) {
        self.inner.finished.store(true, Ordering::Release);
    }

    pub(crate) fn reset(&self) {
        self.inner
            .chunks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.inner.finished.store(false, Ordering::Release);
    }

    /// Oldest chunk not yet taken.
    pub fn take_chunk(&self) -> Option<Bytes> {
        self.inner
            .chunks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    /// True once the terminating zero-length chunk has been read.
    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.inner
            .chunks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Inflate a gzip member.
pub fn inflate_gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4);
    GzDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub message: String,
    headers: Headers,
    body: Bytes,
    chunks: ChunkQueue,
    request_uri: Uri,
}

impl Response {
    pub(crate) fn new(request_uri: Uri, chunks: ChunkQueue) -> Self {
        Self {
            status: 0,
            message: String::new(),
            headers: Headers::new(),
            body: Bytes::new(),
            chunks,
            request_uri,
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub(crate) fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn header(&self, name: &str) -> &str {
        self.headers.get(name)
    }

    pub fn etag(&self) -> Option<&str> {
        Some(self.header("etag")).filter(|e| !e.is_empty())
    }

    /// Final body: chunks joined, gzip inflated.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_bytes(&self) -> Bytes {
        self.body.clone()
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Body as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn take_chunk(&self) -> Option<Bytes> {
        self.chunks.take_chunk()
    }

    pub fn chunks(&self) -> &ChunkQueue {
        &self.chunks
    }

    /// URI of the request that produced this response (after any redirects so far).
    pub fn request_uri(&self) -> &Uri {
        &self.request_uri
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 307)
    }

    pub fn is_gzip(&self) -> bool {
        self.header("content-encoding").contains("gzip")
    }

    /// Commit every `Set-Cookie` value to `jar`, scoping unscoped cookies to the request's host
    /// and path.
    ///
    /// A malformed cookie is logged and skipped. Fails only when there are cookies to store and
    /// no jar. Returns the number of cookies stored.
    pub fn extract_cookies(&self, jar: Option<&CookieJar>) -> Result<usize, ProtocolError> {
        let values = self.headers.get_all("set-cookie");
        if values.is_empty() {
            return Ok(0);
        }
        let jar = jar.ok_or(ProtocolError::MissingCookieJar)?;
        let mut stored = 0;
        for value in values {
            let mut cookie_string = value.clone();
            let lower = cookie_string.to_ascii_lowercase();
            if !lower.contains("domain=") {
                cookie_string.push_str("; domain=");
                cookie_string.push_str(self.request_uri.host());
            }
            if !lower.contains("path=") {
                cookie_string.push_str("; path=");
                cookie_string.push_str(self.request_uri.path());
            }
            match Cookie::parse(&cookie_string) {
                Ok(cookie) => {
                    if jar.set_cookie(cookie) {
                        stored += 1;
                    }
                }
                Err(e) => warn!(uri = %self.request_uri, error = %e, "skipping malformed Set-Cookie"),
            }
        }
        debug!(uri = %self.request_uri, stored, "Set-Cookie committed");
        Ok(stored)
    }
}
