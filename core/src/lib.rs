/*
 * lib.rs
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

//! Wirehttp core: an HTTP/1.1 client with redirects, ETag revalidation, gzip and a shared
//! cookie jar.

pub mod config;
pub mod net;
pub mod protocol;
pub mod uri;

pub use config::HttpConfig;
pub use protocol::http::{
    Cookie, CookieJar, HttpClient, HttpError, Method, Request, Response,
};
pub use uri::Uri;
