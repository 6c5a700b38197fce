/*
 * connection.rs
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

//! HTTP connection: one TCP or TLS stream per attempt. Writes the serialized request, drives the
//! H1 parser over the socket, and assembles the `Response` (chunk queue, gzip, cookies).

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream as TokioTlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::config::HttpConfig;
use crate::net::http_client_config;
use crate::protocol::http::cookie_jar::CookieJar;
use crate::protocol::http::error::HttpError;
use crate::protocol::http::h1::{H1ResponseHandler, ParseState, ResponseParser};
use crate::protocol::http::request::{Method, Request, RequestState};
use crate::protocol::http::response::{inflate_gzip, ChunkQueue, Response};
use crate::uri::Uri;

/// Unified stream: plain TCP or TLS. Implements AsyncRead + AsyncWrite.
pub enum HttpStream {
    Plain(TcpStream),
    Tls(Box<TokioTlsStream<TcpStream>>),
}

impl AsyncRead for HttpStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for HttpStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_flush(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Opens the byte stream for one attempt. `secure` asks for TLS on top of TCP.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, host: &str, port: u16, secure: bool) -> io::Result<HttpStream>;
}

/// TCP connect with a timeout, then a rustls handshake when `secure`.
pub struct TcpConnector {
    tls: TlsConnector,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(config: &HttpConfig) -> io::Result<Self> {
        let tls_config = http_client_config(config.insecure_skip_verify)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(Self {
            tls: TlsConnector::from(tls_config),
            connect_timeout: config.connect_timeout,
        })
    }
}

/// Plain TCP connect bounded by `limit`.
pub async fn connect_tcp(host: &str, port: u16, limit: Duration) -> io::Result<TcpStream> {
    let tcp = timeout(limit, TcpStream::connect((host, port)))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "TCP connect timed out"))??;
    tcp.set_nodelay(true)?;
    Ok(tcp)
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &str, port: u16, secure: bool) -> io::Result<HttpStream> {
        debug!(host, port, secure, "connecting");
        let tcp = connect_tcp(host, port, self.connect_timeout).await?;
        if !secure {
            return Ok(HttpStream::Plain(tcp));
        }
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?;
        let tls = self
            .tls
            .connect(server_name, tcp)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
        Ok(HttpStream::Tls(Box::new(tls)))
    }
}

/// Builds a `Response` from parser callbacks.
struct ResponseAssembler {
    response: Response,
    body: BytesMut,
    current_chunk: BytesMut,
}

impl ResponseAssembler {
    fn new(uri: Uri, chunks: ChunkQueue) -> Self {
        Self {
            response: Response::new(uri, chunks),
            body: BytesMut::new(),
            current_chunk: BytesMut::new(),
        }
    }

    /// 1xx other than 101: an informational block (`100 Continue`, `103 Early Hints`) that the
    /// final response follows on the same connection.
    fn is_interim(&self) -> bool {
        let status = self.response.status;
        (100..200).contains(&status) && status != 101
    }

    /// Body mode for the header block just parsed: (content length, chunked).
    ///
    /// Interim 1xx blocks never reach here; `101 Switching Protocols` ends the HTTP exchange
    /// at its header block.
    fn body_mode(&self, method: &Method) -> (Option<u64>, bool) {
        let status = self.response.status;
        if *method == Method::Head || (100..200).contains(&status) || status == 204 || status == 304 {
            return (Some(0), false);
        }
        let chunked = self
            .response
            .header("transfer-encoding")
            .to_ascii_lowercase()
            .contains("chunked");
        let content_length = self.response.header("content-length").parse::<u64>().ok();
        (content_length, chunked)
    }

    fn finish(mut self) -> Result<Response, HttpError> {
        let raw = self.body.freeze();
        let body = if self.response.is_gzip() && !raw.is_empty() {
            Bytes::from(inflate_gzip(&raw)?)
        } else {
            raw
        };
        self.response.set_body(body);
        Ok(self.response)
    }
}

impl H1ResponseHandler for ResponseAssembler {
    fn status(&mut self, code: u16, message: &str) {
        self.response.status = code;
        self.response.message = message.to_string();
    }

    fn header(&mut self, name: &str, value: &str) {
        self.response.headers_mut().add(name, value);
    }

    fn body_chunk(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
        self.current_chunk.extend_from_slice(data);
    }

    fn end_chunk(&mut self) {
        let chunk = self.current_chunk.split().freeze();
        debug!(len = chunk.len(), "chunk received");
        self.response.chunks().push(chunk);
    }

    fn end_body(&mut self) {
        self.current_chunk.clear();
    }

    fn trailer(&mut self, name: &str, value: &str) {
        self.response.headers_mut().add(name, value);
    }

    fn complete(&mut self) {
        self.response.chunks().finish();
    }
}

/// Write the serialized request and flush.
pub async fn write_request<S>(stream: &mut S, request: &Request) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&request.to_wire_bytes()).await?;
    stream.flush().await
}

/// Read one response from `stream` for `request`.
///
/// `Set-Cookie` values are committed to `jar` as soon as the header block is parsed, before the
/// body is read.
pub async fn read_response<S>(
    stream: &mut S,
    request: &Request,
    jar: Option<&CookieJar>,
) -> Result<Response, HttpError>
where
    S: AsyncRead + Unpin,
{
    let chunks = request.chunks();
    chunks.reset();
    let mut parser = ResponseParser::new();
    let mut assembler = ResponseAssembler::new(request.uri().clone(), chunks);
    let mut read_buf = BytesMut::with_capacity(8192);

    while parser.state() != ParseState::Idle {
        read_buf.reserve(4096);
        let n = stream.read_buf(&mut read_buf).await?;
        if n == 0 {
            parser.finish(&mut assembler)?;
            break;
        }
        loop {
            parser.receive(&mut read_buf, &mut assembler)?;
            if parser.state() != ParseState::HeadersComplete {
                break;
            }
            if assembler.is_interim() {
                debug!(status = assembler.response.status, "skipping interim response");
                parser.reset();
                assembler = ResponseAssembler::new(request.uri().clone(), request.chunks());
                continue;
            }
            if let Some(jar) = jar {
                assembler.response.extract_cookies(Some(jar))?;
            }
            let (content_length, chunked) = assembler.body_mode(&request.method);
            parser.set_body_mode(content_length, chunked);
        }
    }
    assembler.finish()
}

/// One attempt: connect, write, read, close.
pub async fn exchange(
    connector: &Arc<dyn Connector>,
    request: &mut Request,
    jar: Option<&CookieJar>,
) -> Result<Response, HttpError> {
    let uri = request.uri().clone();
    let mut stream = connector
        .connect(uri.host(), uri.port(), uri.is_secure())
        .await?;
    write_request(&mut stream, request).await?;
    request.state = RequestState::Reading;
    let response = read_response(&mut stream, request, jar).await;
    let _ = stream.shutdown().await;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::http::cookie::CookieAccessInfo;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    async fn parse(raw: &[u8]) -> Result<Response, HttpError> {
        let request = Request::get("http://h.test/page").unwrap();
        let mut stream = raw;
        read_response(&mut stream, &request, None).await
    }

    #[tokio::test]
    async fn simple_response() {
        let r = parse(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").await.unwrap();
        assert_eq!(r.status, 200);
        assert_eq!(r.message, "OK");
        assert_eq!(r.body(), b"hello");
    }

    #[tokio::test]
    async fn extra_bytes_after_content_length_are_ignored() {
        let r = parse(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nokEXTRA").await.unwrap();
        assert_eq!(r.body(), b"ok");
    }

    #[tokio::test]
    async fn short_body_is_protocol_error() {
        let err = parse(b"HTTP/1.1 200 OK\r\nContent-Length: 9\r\n\r\nhello").await.unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("length mismatch"));
    }

    #[tokio::test]
    async fn chunked_body_fills_queue() {
        let request = Request::get("http://h.test/").unwrap();
        let consumer = request.chunks();
        let mut stream: &[u8] =
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
        let r = read_response(&mut stream, &request, None).await.unwrap();
        assert_eq!(r.body(), b"Wikipedia");
        assert!(consumer.is_finished());
        assert_eq!(consumer.take_chunk().as_deref(), Some(&b"Wiki"[..]));
        assert_eq!(r.take_chunk().as_deref(), Some(&b"pedia"[..]));
        assert!(r.take_chunk().is_none());
    }

    #[tokio::test]
    async fn gzip_body_is_inflated() {
        let packed = gzip(b"plain text, compressed");
        let mut raw = format!(
            "HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: {}\r\n\r\n",
            packed.len()
        )
        .into_bytes();
        raw.extend_from_slice(&packed);
        let r = parse(&raw).await.unwrap();
        assert_eq!(r.text(), "plain text, compressed");
    }

    #[tokio::test]
    async fn gzip_chunked_body_is_inflated_after_joining() {
        let packed = gzip(b"Wikipedia in chunks");
        let (a, b) = packed.split_at(packed.len() / 2);
        let mut raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nContent-Encoding: gzip\r\n\r\n".to_vec();
        for part in [a, b] {
            raw.extend_from_slice(format!("{:x}\r\n", part.len()).as_bytes());
            raw.extend_from_slice(part);
            raw.extend_from_slice(b"\r\n");
        }
        raw.extend_from_slice(b"0\r\n\r\n");
        let r = parse(&raw).await.unwrap();
        assert_eq!(r.body(), b"Wikipedia in chunks");
    }

    #[tokio::test]
    async fn corrupt_gzip_is_transport_error() {
        let err = parse(b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: 4\r\n\r\nnope")
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn head_and_no_content_have_no_body() {
        let mut request = Request::get("http://h.test/").unwrap();
        request.method = Method::Head;
        let mut stream: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 1234\r\n\r\n";
        let r = read_response(&mut stream, &request, None).await.unwrap();
        assert!(r.body().is_empty());
        let r = parse(b"HTTP/1.1 304 Not Modified\r\nETag: \"x\"\r\n\r\n").await.unwrap();
        assert_eq!(r.status, 304);
        assert_eq!(r.etag(), Some("\"x\""));
    }

    #[tokio::test]
    async fn interim_responses_are_skipped() {
        let r = parse(
            b"HTTP/1.1 100 Continue\r\n\r\n\
HTTP/1.1 103 Early Hints\r\nLink: </style.css>; rel=preload\r\n\r\n\
HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nfinal",
        )
        .await
        .unwrap();
        assert_eq!(r.status, 200);
        assert_eq!(r.body(), b"final");
        assert!(!r.headers().contains("link"));
    }

    #[tokio::test]
    async fn switching_protocols_ends_at_headers() {
        let r = parse(b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(r.status, 101);
        assert!(r.body().is_empty());
    }

    #[tokio::test]
    async fn set_cookie_is_committed_to_jar() {
        let jar = CookieJar::new();
        let request = Request::get("http://h.test/account").unwrap();
        let mut stream: &[u8] =
            b"HTTP/1.1 200 OK\r\nSet-Cookie: sid=1\r\nSet-Cookie: lang=en; Path=/\r\nContent-Length: 0\r\n\r\n";
        read_response(&mut stream, &request, Some(&jar)).await.unwrap();
        let got = jar.get_cookies(&CookieAccessInfo::new("h.test", "/account"));
        assert_eq!(got.len(), 2);
    }
}
