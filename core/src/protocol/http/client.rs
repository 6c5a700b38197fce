/*
 * client.rs
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

//! HTTP client: owns configuration, the default cookie jar, the ETag cache and the connector, and
//! runs the connect -> write -> parse -> redirect loop for each request.
//!
//! Three ways to send: `execute` (async), `send` (spawned, returns a `JoinHandle`),
//! `send_blocking` (blocks the calling thread). `send_with_callback` keeps the callback contract:
//! synchronous requests call back inline, others call back on a `CompletionSink` or the worker.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::HttpConfig;
use crate::protocol::http::connection::{exchange, Connector, TcpConnector};
use crate::protocol::http::cookie_jar::CookieJar;
use crate::protocol::http::dispatch::{Completion, CompletionSink};
use crate::protocol::http::error::HttpError;
use crate::protocol::http::etag::EtagCache;
use crate::protocol::http::request::{CookieJarChoice, Method, Request, RequestState};
use crate::protocol::http::response::Response;
use crate::uri::Uri;

struct ClientState {
    config: HttpConfig,
    cookie_jar: Arc<CookieJar>,
    etags: Arc<EtagCache>,
    connector: Arc<dyn Connector>,
    runtime_handle: Handle,
}

/// Cheap to clone; clones share jar, cache, connector and runtime.
#[derive(Clone)]
pub struct HttpClient {
    state: Arc<ClientState>,
}

/// Assembles an `HttpClient`; anything not supplied gets a fresh default.
pub struct HttpClientBuilder {
    config: HttpConfig,
    cookie_jar: Option<Arc<CookieJar>>,
    etags: Option<Arc<EtagCache>>,
    connector: Option<Arc<dyn Connector>>,
    runtime_handle: Option<Handle>,
}

impl HttpClientBuilder {
    pub fn cookie_jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    pub fn etag_cache(mut self, etags: Arc<EtagCache>) -> Self {
        self.etags = Some(etags);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn runtime_handle(mut self, handle: Handle) -> Self {
        self.runtime_handle = Some(handle);
        self
    }

    /// Without an explicit runtime handle this must run inside a tokio runtime.
    pub fn build(self) -> io::Result<HttpClient> {
        let connector: Arc<dyn Connector> = match self.connector {
            Some(c) => c,
            None => Arc::new(TcpConnector::new(&self.config)?),
        };
        let runtime_handle = match self.runtime_handle {
            Some(h) => h,
            None => Handle::try_current()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?,
        };
        Ok(HttpClient {
            state: Arc::new(ClientState {
                config: self.config,
                cookie_jar: self.cookie_jar.unwrap_or_default(),
                etags: self.etags.unwrap_or_default(),
                connector,
                runtime_handle,
            }),
        })
    }
}

impl HttpClient {
    pub fn builder(config: HttpConfig) -> HttpClientBuilder {
        HttpClientBuilder {
            config,
            cookie_jar: None,
            etags: None,
            connector: None,
            runtime_handle: None,
        }
    }

    /// Client on the current tokio runtime.
    pub fn new(config: HttpConfig) -> io::Result<Self> {
        Self::builder(config).build()
    }

    pub fn with_runtime_handle(config: HttpConfig, handle: Handle) -> io::Result<Self> {
        Self::builder(config).runtime_handle(handle).build()
    }

    pub fn config(&self) -> &HttpConfig {
        &self.state.config
    }

    /// The jar used by requests left on `CookieJarChoice::ClientDefault`.
    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.state.cookie_jar
    }

    pub fn etag_cache(&self) -> &Arc<EtagCache> {
        &self.state.etags
    }

    pub fn runtime_handle(&self) -> &Handle {
        &self.state.runtime_handle
    }

    /// New request carrying this client's retry and gzip defaults.
    pub fn request(&self, method: impl Into<Method>, uri: &str) -> Result<Request, HttpError> {
        let mut request = Request::with_uri(method.into(), Uri::parse(uri)?);
        request.maximum_retry_count = self.state.config.maximum_retry_count;
        request.accept_gzip = self.state.config.accept_gzip;
        Ok(request)
    }

    fn resolve_jar(&self, request: &Request) -> Option<Arc<CookieJar>> {
        match &request.cookie_jar {
            CookieJarChoice::ClientDefault => Some(self.state.cookie_jar.clone()),
            CookieJarChoice::Jar(jar) => Some(jar.clone()),
            CookieJarChoice::Disabled => None,
        }
    }

    /// Cookie header from the jar, then default headers the caller did not set.
    fn prepare(&self, request: &mut Request, jar: Option<&CookieJar>) {
        if let Some(jar) = jar {
            let uri = request.uri();
            let cookies = jar.cookies_for_request(uri.host(), uri.path(), uri.is_secure());
            if !cookies.is_empty() {
                let mut header = request
                    .header("cookie")
                    .trim_end_matches(|c| c == ';' || c == ' ')
                    .to_string();
                for cookie in &cookies {
                    let pair = cookie.to_value_string();
                    if header.split(';').any(|p| p.trim() == pair) {
                        continue;
                    }
                    if !header.is_empty() {
                        header.push_str("; ");
                    }
                    header.push_str(&pair);
                }
                request.set_header("Cookie", &header);
            }
        }

        let body_len = request.body.as_ref().map_or(0, |b| b.len());
        if body_len > 0 && !request.headers().contains("content-length") {
            request.set_header("Content-Length", &body_len.to_string());
        }
        if !request.headers().contains("user-agent") {
            let user_agent = self.state.config.user_agent.clone();
            request.set_header("User-Agent", &user_agent);
        }
        if !request.headers().contains("connection") {
            request.set_header("Connection", "close");
        }
        if request.accept_gzip {
            request.set_header("Accept-Encoding", "gzip");
        }
        if let Some(credentials) = request.uri().basic_credentials() {
            let value = format!("Basic {}", STANDARD.encode(credentials.as_bytes()));
            request.set_header("Authorization", &value);
        }
    }

    /// Attempt loop. Each attempt is one connection; a 301/302/307 retargets the request and
    /// consumes an attempt. The last response seen is returned when attempts run out.
    ///
    /// Headers are not reset between attempts: the `Cookie` and `Authorization` values computed
    /// for the original host are also sent to a redirect target on another host.
    async fn run(&self, request: &mut Request, jar: Option<&CookieJar>) -> Result<Response, HttpError> {
        let attempts = request.maximum_retry_count.max(1);
        let mut attempt = 0;
        let response = loop {
            attempt += 1;
            if request.use_cache {
                match self.state.etags.get(&request.uri().absolute()) {
                    Some(etag) => {
                        request.set_header("If-None-Match", &etag);
                    }
                    None => {
                        request.headers_mut().remove("if-none-match");
                    }
                }
            }
            let host = request.uri().host_header();
            request.set_header("Host", &host);

            let response = exchange(&self.state.connector, request, jar).await?;
            debug!(uri = %request.uri(), status = response.status, attempt, "response");

            if !response.is_redirect() || attempt >= attempts {
                break response;
            }
            let location = response.header("location");
            if location.is_empty() {
                warn!(uri = %request.uri(), status = response.status, "redirect without Location");
                break response;
            }
            let next = request.uri().join(location)?;
            debug!(from = %request.uri(), to = %next, "following redirect");
            request.set_uri(next);
        };

        if request.use_cache {
            if let Some(etag) = response.etag() {
                self.state.etags.store(&request.uri().absolute(), etag);
            }
        }
        Ok(response)
    }

    /// Send `request` and record the outcome on it. Never fails: errors land in
    /// `request.error()` with no response.
    pub async fn execute(&self, request: &mut Request) {
        let started = Instant::now();
        request.reset();
        let jar = self.resolve_jar(request);
        self.prepare(request, jar.as_deref());

        match self.run(request, jar.as_deref()).await {
            Ok(response) => request.response = Some(response),
            Err(e) => {
                warn!(uri = %request.uri(), error = %e, "request failed");
                request.error = Some(e);
                request.response = None;
            }
        }
        request.state = RequestState::Done;
        request.response_time = started.elapsed();

        if self.state.config.log_all_requests {
            info!("{}", request.info_string(self.state.config.verbose_logging));
        }
    }

    /// Run `request` on the client's runtime; the handle resolves to the finished request.
    pub fn send(&self, request: Request) -> JoinHandle<Request> {
        let client = self.clone();
        self.state.runtime_handle.spawn(async move {
            let mut request = request;
            client.execute(&mut request).await;
            request
        })
    }

    /// Run `request` to completion on the calling thread.
    ///
    /// Panics if called from inside an async context, like `Handle::block_on`.
    pub fn send_blocking(&self, request: &mut Request) {
        self.state.runtime_handle.block_on(self.execute(request));
    }

    /// Send and call back when done.
    ///
    /// A `synchronous` request runs on the calling thread and `callback` runs inline before this
    /// returns. Otherwise the request runs on the runtime; when it finishes it is handed to
    /// `sink` if one is given, else `callback` runs on the worker.
    ///
    /// Panics if a `synchronous` request is sent from inside an async context, like
    /// `Handle::block_on`.
    pub fn send_with_callback<F>(
        &self,
        request: Request,
        callback: F,
        sink: Option<Arc<dyn CompletionSink>>,
    ) where
        F: FnOnce(Request) + Send + 'static,
    {
        let mut request = request;
        if request.synchronous {
            self.send_blocking(&mut request);
            callback(request);
            return;
        }
        let client = self.clone();
        self.state.runtime_handle.spawn(async move {
            client.execute(&mut request).await;
            match sink {
                Some(sink) => sink.enqueue(Completion::new(request, Box::new(callback))),
                None => callback(request),
            }
        });
    }
}
