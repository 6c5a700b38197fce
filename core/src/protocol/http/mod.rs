/*
 * mod.rs
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

//! HTTP/1.1 client over raw sockets.
//!
//! - One connection per attempt, `Connection: close` by default; redirects (301/302/307) consume
//!   attempts from `Request::maximum_retry_count`.
//! - Responses are push-parsed (`h1::ResponseParser`); chunked bodies are exposed incrementally
//!   through the request's `ChunkQueue` while still arriving.
//! - Cookies: `Set-Cookie` is committed to a `CookieJar` as soon as headers are parsed.
//! - Buffers: `bytes` crate (BytesMut for the parse buffer, Bytes for payload slices).

mod cache;
mod connection;
mod cookie;
mod cookie_jar;
mod dispatch;
mod error;
mod etag;
mod headers;
mod request;
mod response;

pub mod client;
pub mod h1;

pub use cache::{MemoryResponseCache, ResponseCache};
pub use client::{HttpClient, HttpClientBuilder};
pub use connection::{
    connect_tcp, exchange, read_response, write_request, Connector, HttpStream, TcpConnector,
};
pub use cookie::{parse_cookie_date, Cookie, CookieAccessInfo};
pub use cookie_jar::{CookieJar, JAR_DELIMITER, JAR_FORMAT_VERSION};
pub use dispatch::{Completion, CompletionCallback, CompletionQueue, CompletionSink};
pub use error::{CookieError, HttpError, ProtocolError};
pub use etag::EtagCache;
pub use headers::Headers;
pub use request::{
    CookieJarChoice, Method, Request, RequestState, DEFAULT_MAXIMUM_RETRY_COUNT,
    DEFAULT_PROTOCOL,
};
pub use response::{inflate_gzip, ChunkQueue, Response};
