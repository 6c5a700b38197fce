/*
 * cache.rs
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

//! Body cache keyed by absolute URI and revalidated with ETags.
//!
//! `HttpClient::fetch_cached` sends `If-None-Match` with the stored token and serves the stored
//! body as a 304 when the server says it is unchanged, or when the request fails outright.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::protocol::http::client::HttpClient;
use crate::protocol::http::request::Request;
use crate::protocol::http::response::Response;

/// Storage behind `HttpClient::fetch_cached`.
pub trait ResponseCache: Send + Sync {
    fn lookup(&self, key: &str) -> Option<Bytes>;

    /// ETag the body under `key` was stored with.
    fn revalidation_token(&self, key: &str) -> Option<String>;

    fn store(&self, key: &str, body: Bytes, revalidation_token: &str);
}

#[derive(Debug, Default)]
pub struct MemoryResponseCache {
    entries: RwLock<HashMap<String, (Bytes, String)>>,
}

impl MemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResponseCache for MemoryResponseCache {
    fn lookup(&self, key: &str) -> Option<Bytes> {
        let entries = self.entries.read().ok()?;
        entries.get(key).map(|(body, _)| body.clone())
    }

    fn revalidation_token(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().ok()?;
        entries.get(key).map(|(_, token)| token.clone())
    }

    fn store(&self, key: &str, body: Bytes, revalidation_token: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), (body, revalidation_token.to_string()));
        }
    }
}

impl HttpClient {
    /// Send `request`, revalidating against `cache`.
    ///
    /// A 200 carrying an ETag refreshes the entry. If an entry exists and the answer is anything
    /// other than 200 (a 304, another status, or a transport failure) the response becomes a 304
    /// with the cached body and any error is cleared. Returns true iff the body came from `cache`.
    pub async fn fetch_cached(&self, request: &mut Request, cache: &dyn ResponseCache) -> bool {
        let key = request.uri().absolute();
        let cached = cache.lookup(&key);
        if cached.is_some() {
            if let Some(token) = cache.revalidation_token(&key) {
                request.set_header("If-None-Match", &token);
            }
        }

        self.execute(request).await;

        if let Some(response) = request.response() {
            if response.status == 200 {
                if let Some(etag) = response.etag() {
                    cache.store(&key, response.body_bytes(), etag);
                }
                return false;
            }
        }
        let Some(body) = cached else {
            return false;
        };

        if let Some(e) = request.take_error() {
            warn!(uri = %key, error = %e, "serving cached body after failure");
        } else {
            debug!(uri = %key, "serving cached body");
        }
        let mut response = match request.take_response() {
            Some(r) => r,
            None => Response::new(request.uri().clone(), request.chunks()),
        };
        response.status = 304;
        response.message = "Not Modified".to_string();
        response.set_body(body);
        request.response = Some(response);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_cache_stores_body_and_token() {
        let cache = MemoryResponseCache::new();
        assert!(cache.lookup("http://h/").is_none());
        cache.store("http://h/", Bytes::from_static(b"body"), "\"v1\"");
        assert_eq!(cache.lookup("http://h/").unwrap(), Bytes::from_static(b"body"));
        assert_eq!(cache.revalidation_token("http://h/").unwrap(), "\"v1\"");
        cache.store("http://h/", Bytes::from_static(b"new"), "\"v2\"");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.revalidation_token("http://h/").unwrap(), "\"v2\"");
    }
}
