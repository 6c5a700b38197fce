/*
 * parser.rs
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

//! HTTP/1.1 response push parser: status line, headers, body (Content-Length, chunked, or
//! read-until-close), trailers.
//!
//! Lines end at LF; a preceding CR is dropped and the line is trimmed.

use bytes::BytesMut;
use tracing::debug;

use crate::protocol::http::error::ProtocolError;

/// Callback for HTTP/1.1 response events.
pub trait H1ResponseHandler {
    fn status(&mut self, code: u16, message: &str);
    fn header(&mut self, name: &str, value: &str);
    /// Body bytes as they arrive; for chunked bodies a chunk may be split over several calls.
    fn body_chunk(&mut self, data: &[u8]);
    /// The current chunk of a chunked body is complete.
    fn end_chunk(&mut self);
    fn end_body(&mut self);
    fn trailer(&mut self, name: &str, value: &str);
    fn complete(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Idle,
    StatusLine,
    Headers,
    /// Headers done; the caller must call `set_body_mode`.
    HeadersComplete,
    Body,
    ChunkSize,
    ChunkData,
    /// CRLF after chunk data.
    ChunkDataEnd,
    ChunkTrailer,
}

/// How a header line was classified.
#[derive(Debug, PartialEq, Eq)]
enum HeaderLine<'a> {
    Field(&'a str, &'a str),
    End,
    /// No `:`. Ends the header block; the line is discarded.
    Malformed,
}

fn classify(line: &str) -> HeaderLine<'_> {
    if line.is_empty() {
        return HeaderLine::End;
    }
    match line.split_once(':') {
        Some((name, value)) => HeaderLine::Field(name.trim(), value.trim()),
        None => HeaderLine::Malformed,
    }
}

/// Push parser for an HTTP/1.1 response. Feed bytes via `receive`, signal end of stream with
/// `finish`.
#[derive(Debug)]
pub struct ResponseParser {
    state: ParseState,
    /// None for chunked or read-until-close.
    content_length: Option<u64>,
    bytes_received: u64,
    chunk_remaining: u64,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::StatusLine,
            content_length: None,
            bytes_received: 0,
            chunk_remaining: 0,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Split one line off the front of `buf`, or None if no LF has arrived yet.
    fn take_line(buf: &mut BytesMut) -> Option<String> {
        let lf = buf.iter().position(|&b| b == b'\n')?;
        let line = buf.split_to(lf + 1);
        Some(String::from_utf8_lossy(&line[..lf]).trim().to_string())
    }

    fn parse_status_line<H: H1ResponseHandler>(
        line: &str,
        handler: &mut H,
    ) -> Result<(), ProtocolError> {
        // HTTP/1.1 200 OK, HTTP/1.1 404 Not Found, HTTP/1.1 204
        let fields: Vec<&str> = line.split(' ').collect();
        let code = fields
            .get(1)
            .and_then(|s| s.parse::<u16>().ok())
            .ok_or_else(|| ProtocolError::BadStatusCode(line.to_string()))?;
        let message = fields.get(2..).map(|f| f.join(" ")).unwrap_or_default();
        handler.status(code, &message);
        Ok(())
    }

    /// Consume and parse as much as possible from `buf`. Partial tokens stay in `buf`.
    /// Returns early in `HeadersComplete` so the caller can choose the body mode.
    pub fn receive<H: H1ResponseHandler>(
        &mut self,
        buf: &mut BytesMut,
        handler: &mut H,
    ) -> Result<(), ProtocolError> {
        loop {
            match self.state {
                ParseState::Idle | ParseState::HeadersComplete => return Ok(()),
                ParseState::StatusLine => {
                    let Some(line) = Self::take_line(buf) else { return Ok(()) };
                    Self::parse_status_line(&line, handler)?;
                    self.state = ParseState::Headers;
                }
                ParseState::Headers => {
                    let Some(line) = Self::take_line(buf) else { return Ok(()) };
                    match classify(&line) {
                        HeaderLine::Field(name, value) => handler.header(name, value),
                        HeaderLine::End => self.state = ParseState::HeadersComplete,
                        HeaderLine::Malformed => {
                            debug!(line = %line, "header line without ':' ends the header block");
                            self.state = ParseState::HeadersComplete;
                        }
                    }
                }
                ParseState::Body => {
                    if buf.is_empty() {
                        return Ok(());
                    }
                    match self.content_length {
                        Some(length) => {
                            let remaining = (length - self.bytes_received) as usize;
                            let to_read = remaining.min(buf.len());
                            let chunk = buf.split_to(to_read);
                            handler.body_chunk(&chunk);
                            self.bytes_received += to_read as u64;
                            if self.bytes_received >= length {
                                handler.end_body();
                                handler.complete();
                                self.state = ParseState::Idle;
                            }
                        }
                        None => {
                            // Read until close: deliver all available; finish() ends the body
                            let chunk = buf.split_to(buf.len());
                            self.bytes_received += chunk.len() as u64;
                            handler.body_chunk(&chunk);
                            return Ok(());
                        }
                    }
                }
                ParseState::ChunkSize => {
                    let Some(line) = Self::take_line(buf) else { return Ok(()) };
                    let hex_part = line.split(';').next().unwrap_or("").trim();
                    let size = u64::from_str_radix(hex_part, 16)
                        .map_err(|_| ProtocolError::BadChunkLength(line.clone()))?;
                    if size == 0 {
                        self.state = ParseState::ChunkTrailer;
                    } else {
                        self.chunk_remaining = size;
                        self.state = ParseState::ChunkData;
                    }
                }
                ParseState::ChunkData => {
                    if buf.is_empty() {
                        return Ok(());
                    }
                    let to_read = (self.chunk_remaining as usize).min(buf.len());
                    let chunk = buf.split_to(to_read);
                    handler.body_chunk(&chunk);
                    self.chunk_remaining -= to_read as u64;
                    self.bytes_received += to_read as u64;
                    if self.chunk_remaining == 0 {
                        handler.end_chunk();
                        self.state = ParseState::ChunkDataEnd;
                    }
                }
                ParseState::ChunkDataEnd => {
                    if Self::take_line(buf).is_none() {
                        return Ok(());
                    }
                    self.state = ParseState::ChunkSize;
                }
                ParseState::ChunkTrailer => {
                    let Some(line) = Self::take_line(buf) else { return Ok(()) };
                    match classify(&line) {
                        HeaderLine::Field(name, value) => handler.trailer(name, value),
                        HeaderLine::End | HeaderLine::Malformed => {
                            handler.end_body();
                            handler.complete();
                            self.state = ParseState::Idle;
                        }
                    }
                }
            }
        }
    }

    /// Called after headers are received (state `HeadersComplete`).
    pub fn set_body_mode(&mut self, content_length: Option<u64>, chunked: bool) {
        if self.state != ParseState::HeadersComplete {
            return;
        }
        self.bytes_received = 0;
        if chunked {
            self.content_length = None;
            self.state = ParseState::ChunkSize;
        } else if let Some(cl) = content_length {
            self.content_length = Some(cl);
            self.state = if cl == 0 { ParseState::Idle } else { ParseState::Body };
        } else {
            self.content_length = None;
            self.state = ParseState::Body; // read until close
        }
    }

    /// The stream ended. Completes a read-until-close body; anything else still in flight is an
    /// error.
    pub fn finish<H: H1ResponseHandler>(&mut self, handler: &mut H) -> Result<(), ProtocolError> {
        match (self.state, self.content_length) {
            (ParseState::Idle, _) => Ok(()),
            (ParseState::Body, None) => {
                handler.end_body();
                handler.complete();
                self.state = ParseState::Idle;
                Ok(())
            }
            (ParseState::Body, Some(expected)) => Err(ProtocolError::LengthMismatch {
                expected,
                actual: self.bytes_received,
            }),
            _ => Err(ProtocolError::UnterminatedStream),
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        status: Option<(u16, String)>,
        headers: Vec<(String, String)>,
        trailers: Vec<(String, String)>,
        body: Vec<u8>,
        chunks: Vec<Vec<u8>>,
        current: Vec<u8>,
        completed: bool,
    }

    impl H1ResponseHandler for Recorder {
        fn status(&mut self, code: u16, message: &str) {
            self.status = Some((code, message.to_string()));
        }
        fn header(&mut self, name: &str, value: &str) {
            self.headers.push((name.to_string(), value.to_string()));
        }
        fn body_chunk(&mut self, data: &[u8]) {
            self.body.extend_from_slice(data);
            self.current.extend_from_slice(data);
        }
        fn end_chunk(&mut self) {
            self.chunks.push(std::mem::take(&mut self.current));
        }
        fn end_body(&mut self) {}
        fn trailer(&mut self, name: &str, value: &str) {
            self.trailers.push((name.to_string(), value.to_string()));
        }
        fn complete(&mut self) {
            self.completed = true;
        }
    }

    /// Feed `input` in pieces of `step` bytes, choosing the body mode from the headers.
    fn run(input: &[u8], step: usize) -> Result<(ResponseParser, Recorder), ProtocolError> {
        let mut parser = ResponseParser::new();
        let mut rec = Recorder::default();
        let mut buf = BytesMut::new();
        for piece in input.chunks(step) {
            buf.extend_from_slice(piece);
            loop {
                parser.receive(&mut buf, &mut rec)?;
                if parser.state() != ParseState::HeadersComplete {
                    break;
                }
                let chunked = rec
                    .headers
                    .iter()
                    .any(|(k, v)| k.eq_ignore_ascii_case("transfer-encoding") && v.contains("chunked"));
                let length = rec
                    .headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.parse().ok());
                parser.set_body_mode(length, chunked);
            }
        }
        parser.finish(&mut rec)?;
        Ok((parser, rec))
    }

    #[test]
    fn content_length_body() {
        for step in [1, 3, 1024] {
            let (_, rec) = run(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello", step).unwrap();
            assert_eq!(rec.status, Some((200, "OK".to_string())));
            assert_eq!(rec.body, b"hello");
            assert!(rec.completed);
        }
    }

    #[test]
    fn multi_word_message_and_missing_message() {
        let (_, rec) = run(b"HTTP/1.1 404 Not Found Here\r\nContent-Length: 0\r\n\r\n", 64).unwrap();
        assert_eq!(rec.status, Some((404, "Not Found Here".to_string())));
        let (_, rec) = run(b"HTTP/1.1 204\r\nContent-Length: 0\r\n\r\n", 64).unwrap();
        assert_eq!(rec.status, Some((204, String::new())));
    }

    #[test]
    fn bad_status_code() {
        let err = run(b"HTTP/1.1 abc OK\r\n\r\n", 64).unwrap_err();
        assert!(matches!(err, ProtocolError::BadStatusCode(_)));
        let err = run(b"garbage\r\n\r\n", 64).unwrap_err();
        assert!(matches!(err, ProtocolError::BadStatusCode(_)));
    }

    #[test]
    fn short_body_is_length_mismatch() {
        let err = run(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nhello", 4).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::LengthMismatch { expected: 10, actual: 5 }
        ));
    }

    #[test]
    fn chunked_body() {
        let input = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
        for step in [1, 2, 7, 4096] {
            let (_, rec) = run(input, step).unwrap();
            assert_eq!(rec.body, b"Wikipedia");
            assert_eq!(rec.chunks, vec![b"Wiki".to_vec(), b"pedia".to_vec()]);
            assert!(rec.completed);
        }
    }

    #[test]
    fn chunk_extensions_and_trailers() {
        let input = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\na;name=x\r\n0123456789\r\n0\r\nX-Checksum: abc\r\n\r\n";
        let (_, rec) = run(input, 5).unwrap();
        assert_eq!(rec.body, b"0123456789");
        assert_eq!(rec.trailers, vec![("X-Checksum".to_string(), "abc".to_string())]);
    }

    #[test]
    fn bad_chunk_length() {
        let input = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n";
        assert!(matches!(run(input, 64).unwrap_err(), ProtocolError::BadChunkLength(_)));
    }

    #[test]
    fn read_until_close_without_length() {
        let (parser, rec) = run(b"HTTP/1.0 200 OK\r\nServer: x\r\n\r\nall of it", 3).unwrap();
        assert_eq!(rec.body, b"all of it");
        assert_eq!(parser.state(), ParseState::Idle);
    }

    #[test]
    fn truncated_headers_are_unterminated() {
        let err = run(b"HTTP/1.1 200 OK\r\nContent-Le", 64).unwrap_err();
        assert!(matches!(err, ProtocolError::UnterminatedStream));
        let err = run(b"", 64).unwrap_err();
        assert!(matches!(err, ProtocolError::UnterminatedStream));
    }

    #[test]
    fn truncated_chunked_body_is_unterminated() {
        let input = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWi";
        assert!(matches!(run(input, 64).unwrap_err(), ProtocolError::UnterminatedStream));
    }

    #[test]
    fn header_line_without_colon_ends_headers() {
        let input = b"HTTP/1.1 200 OK\r\nX-A: 1\r\nnot a header\r\nX-B: 2\r\n";
        let (_, rec) = run(input, 64).unwrap();
        assert_eq!(rec.headers, vec![("X-A".to_string(), "1".to_string())]);
        assert_eq!(rec.body, b"X-B: 2\r\n");
    }

    #[test]
    fn bare_lf_line_endings() {
        let (_, rec) = run(b"HTTP/1.1 200 OK\nContent-Length: 2\n\nok", 64).unwrap();
        assert_eq!(rec.body, b"ok");
    }
}
