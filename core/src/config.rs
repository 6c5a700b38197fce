/*
 * config.rs
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

//! Client configuration: defaults, chained setters, and environment overrides.
//!
//! Environment variables (all optional): `WIREHTTP_USER_AGENT`, `WIREHTTP_MAX_RETRIES`,
//! `WIREHTTP_CONNECT_TIMEOUT_SECS`, `WIREHTTP_INSECURE_SKIP_VERIFY`, `WIREHTTP_LOG_REQUESTS`,
//! `WIREHTTP_VERBOSE`. Booleans accept `1`/`true`/`yes`/`on`.

use std::env;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Sent when a request has no `User-Agent` of its own.
    pub user_agent: String,
    /// Copied into requests created by the client.
    pub maximum_retry_count: u32,
    /// Copied into requests created by the client.
    pub accept_gzip: bool,
    pub connect_timeout: Duration,
    /// Accept any server certificate, logging validation failures. Off by default.
    pub insecure_skip_verify: bool,
    /// Log a one-line summary of every completed send.
    pub log_all_requests: bool,
    /// Include headers and body in the summary.
    pub verbose_logging: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("wirehttp/{}", env!("CARGO_PKG_VERSION")),
            maximum_retry_count: crate::protocol::http::DEFAULT_MAXIMUM_RETRY_COUNT,
            accept_gzip: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            insecure_skip_verify: false,
            log_all_requests: false,
            verbose_logging: false,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl HttpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `WIREHTTP_*` variables. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::default().apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(ua) = lookup("WIREHTTP_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            self.user_agent = ua.trim().to_string();
        }
        if let Some(v) = lookup("WIREHTTP_MAX_RETRIES") {
            match v.trim().parse::<u32>() {
                Ok(n) if n > 0 => self.maximum_retry_count = n,
                _ => warn!(value = %v, "ignoring WIREHTTP_MAX_RETRIES"),
            }
        }
        if let Some(v) = lookup("WIREHTTP_CONNECT_TIMEOUT_SECS") {
            match v.trim().parse::<u64>() {
                Ok(secs) => self.connect_timeout = Duration::from_secs(secs),
                Err(_) => warn!(value = %v, "ignoring WIREHTTP_CONNECT_TIMEOUT_SECS"),
            }
        }
        let flags: [(&str, &mut bool); 3] = [
            ("WIREHTTP_INSECURE_SKIP_VERIFY", &mut self.insecure_skip_verify),
            ("WIREHTTP_LOG_REQUESTS", &mut self.log_all_requests),
            ("WIREHTTP_VERBOSE", &mut self.verbose_logging),
        ];
        for (key, slot) in flags {
            if let Some(v) = lookup(key) {
                match parse_bool(&v) {
                    Some(b) => *slot = b,
                    None => warn!(key, value = %v, "ignoring unparseable boolean"),
                }
            }
        }
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn maximum_retry_count(mut self, count: u32) -> Self {
        self.maximum_retry_count = count;
        self
    }

    pub fn accept_gzip(mut self, accept: bool) -> Self {
        self.accept_gzip = accept;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    pub fn log_all_requests(mut self, log: bool) -> Self {
        self.log_all_requests = log;
        self
    }

    pub fn verbose_logging(mut self, verbose: bool) -> Self {
        self.verbose_logging = verbose;
        self
    }
}
