/*
 * etag.rs
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

//! ETag revalidation cache: absolute URI -> last ETag seen. Concurrent updates are last-write-wins.

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct EtagCache {
    etags: RwLock<HashMap<String, String>>,
}

impl EtagCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, absolute_uri: &str) -> Option<String> {
        self.etags
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(absolute_uri)
            .cloned()
    }

    /// Remember `etag` for `absolute_uri`. Empty values are ignored.
    pub fn store(&self, absolute_uri: &str, etag: &str) {
        if etag.is_empty() {
            return;
        }
        self.etags
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(absolute_uri.to_string(), etag.to_string());
    }

    pub fn remove(&self, absolute_uri: &str) -> Option<String> {
        self.etags
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(absolute_uri)
    }

    pub fn clear(&self) {
        self.etags.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.etags.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
