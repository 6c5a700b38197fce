/*
 * error.rs
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

//! HTTP client errors: protocol framing, transport, cookie parsing.

use std::io;

use thiserror::Error;

/// Malformed or truncated response framing. Always fatal to the current attempt.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("bad status code in status line: {0:?}")]
    BadStatusCode(String),

    #[error("unterminated stream")]
    UnterminatedStream,

    #[error("length mismatch: expected {expected} bytes, read {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("bad chunk length: {0:?}")]
    BadChunkLength(String),

    #[error("response carries Set-Cookie but no cookie jar is attached")]
    MissingCookieJar,
}

/// Cookie string or cookie jar dump could not be parsed.
#[derive(Debug, Error)]
pub enum CookieError {
    #[error("could not parse cookie string: {0:?}")]
    Parse(String),

    #[error("could not parse cookie expiry date: {0:?}")]
    BadExpires(String),

    #[error("cookie jar dump has a missing or unknown version tag")]
    VersionMismatch,
}

/// Error recorded on a request when `send` fails.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Connect, TLS, read, write, or decompression failure.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("cookie error: {0}")]
    Cookie(#[from] CookieError),

    #[error("invalid URI: {0}")]
    InvalidUri(String),
}

impl HttpError {
    pub fn is_protocol(&self) -> bool {
        matches!(self, HttpError::Protocol(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, HttpError::Transport(_))
    }
}
