/*
 * cookie_jar.rs
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

//! Cookie jar: cookies keyed by name, one per (name, domain, path) scope.
//!
//! All reads and writes take the jar's single lock for the duration of the scan. Every structural
//! mutation bumps a generation counter published on a `watch` channel so dependent caches can
//! invalidate.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

use crate::protocol::http::cookie::{Cookie, CookieAccessInfo};
use crate::protocol::http::error::CookieError;

/// Version tag at the head of a serialized jar.
pub const JAR_FORMAT_VERSION: &str = "v2";

/// Separator between the version tag and each serialized cookie.
pub const JAR_DELIMITER: &str = "\n!!::!!\n";

#[derive(Debug)]
pub struct CookieJar {
    cookies: Mutex<BTreeMap<String, Vec<Cookie>>>,
    changes: watch::Sender<u64>,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            cookies: Mutex::new(BTreeMap::new()),
            changes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<Cookie>>> {
        self.cookies.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self) {
        self.changes.send_modify(|generation| *generation += 1);
    }

    /// Receiver whose value is bumped once per mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Number of mutations so far.
    pub fn generation(&self) -> u64 {
        *self.changes.borrow()
    }

    pub fn clear(&self) {
        self.lock().clear();
        self.notify();
    }

    /// Store `cookie`, replacing a stored cookie whose scope collides with it.
    ///
    /// An already-expired cookie is a deletion request: it removes the colliding entry and is not
    /// stored. Returns true iff the cookie was stored.
    pub fn set_cookie(&self, cookie: Cookie) -> bool {
        let expired = cookie.is_expired_at(Utc::now());
        let scope = CookieAccessInfo::from(&cookie);
        let mut cookies = self.lock();

        if let Some(list) = cookies.get_mut(cookie.name()) {
            if let Some(index) = list.iter().position(|c| c.collides_with(&scope)) {
                if expired {
                    list.remove(index);
                    if list.is_empty() {
                        cookies.remove(cookie.name());
                    }
                    drop(cookies);
                    debug!(name = cookie.name(), "cookie deleted by expired Set-Cookie");
                    self.notify();
                    return false;
                }
                list[index] = cookie;
                drop(cookies);
                self.notify();
                return true;
            }
        }
        if expired {
            return false;
        }
        debug!(name = cookie.name(), domain = ?cookie.domain, path = ?cookie.path, "cookie stored");
        cookies
            .entry(cookie.name().to_string())
            .or_default()
            .push(cookie);
        drop(cookies);
        self.notify();
        true
    }

    /// Store each cookie in order; returns how many were stored.
    pub fn set_cookies<I>(&self, cookies: I) -> usize
    where
        I: IntoIterator<Item = Cookie>,
    {
        let mut stored = 0;
        for cookie in cookies {
            if self.set_cookie(cookie) {
                stored += 1;
            }
        }
        stored
    }

    fn first_match<'a>(list: &'a [Cookie], access: &CookieAccessInfo) -> Option<&'a Cookie> {
        let now = Utc::now();
        list.iter().find(|c| !c.is_expired_at(now) && c.matches(access))
    }

    /// First live cookie called `name` that matches `access`.
    pub fn get_cookie(&self, name: &str, access: &CookieAccessInfo) -> Option<Cookie> {
        let cookies = self.lock();
        cookies
            .get(name)
            .and_then(|list| Self::first_match(list, access))
            .cloned()
    }

    /// First live match per name, in name order.
    pub fn get_cookies(&self, access: &CookieAccessInfo) -> Vec<Cookie> {
        let cookies = self.lock();
        cookies
            .values()
            .filter_map(|list| Self::first_match(list, access))
            .cloned()
            .collect()
    }

    /// Cookies to send to `host`/`path`. On a secure channel a secure match is preferred, falling
    /// back to a non-secure one for the same name.
    pub fn cookies_for_request(&self, host: &str, path: &str, secure_channel: bool) -> Vec<Cookie> {
        let plain = CookieAccessInfo::new(host, path);
        if !secure_channel {
            return self.get_cookies(&plain);
        }
        let secure = plain.clone().secure(true);
        let cookies = self.lock();
        cookies
            .values()
            .filter_map(|list| {
                Self::first_match(list, &secure).or_else(|| Self::first_match(list, &plain))
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dump the whole jar: version tag, delimiter, then each cookie followed by the delimiter.
    pub fn serialize(&self) -> String {
        let cookies = self.lock();
        let mut out = String::from(JAR_FORMAT_VERSION);
        out.push_str(JAR_DELIMITER);
        for cookie in cookies.values().flatten() {
            out.push_str(&cookie.to_string());
            out.push_str(JAR_DELIMITER);
        }
        out
    }

    /// Restore cookies from `serialize` output, optionally clearing the jar first.
    ///
    /// Nothing is stored unless the version tag matches and every cookie parses. Returns the
    /// number of cookies stored (expired entries are dropped by `set_cookie`).
    pub fn deserialize(&self, dump: &str, clear: bool) -> Result<usize, CookieError> {
        if clear {
            self.clear();
        }
        let mut parts = dump.split(JAR_DELIMITER);
        match parts.next() {
            Some(tag) if tag.starts_with(JAR_FORMAT_VERSION) => {}
            _ => return Err(CookieError::VersionMismatch),
        }
        let parsed = parts
            .filter(|s| !s.is_empty())
            .map(Cookie::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.set_cookies(parsed))
    }
}
