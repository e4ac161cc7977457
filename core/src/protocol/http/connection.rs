/*
 * connection.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of openml-rs, a client for the OpenML REST API.
 *
 * openml-rs is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * openml-rs is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with openml-rs.  If not, see <http://www.gnu.org/licenses/>.
 */

//! HTTP connection: one persistent transport, drives the H1 parser, returns whole responses.
//!
//! Not synchronized; the OpenML `Connection` wraps it in a mutex. Any failed
//! exchange closes the transport so the next `send` starts on a fresh stream.

use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::{debug, trace, warn};

use crate::error::{ConnectionError, Result};
use crate::protocol::http::h1::{BodyMode, ParseState, ResponseParser};
use crate::protocol::http::request::{host_header, RequestBuilder};
use crate::protocol::http::response::Response;
use crate::transport::Transport;

const READ_CHUNK: usize = 8192;

/// Reconnect instead of reusing a stream idle for longer than this.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(4);

/// HTTP/1.1 client connection over a `Transport`.
pub struct HttpConnection<T: Transport> {
    transport: T,
    host: String,
    port: u16,
    secure: bool,
    idle_timeout: Duration,
    last_used: Option<Instant>,
    read_buf: BytesMut,
}

impl<T: Transport> HttpConnection<T> {
    /// Wrap a transport. Nothing is connected until the first `send`.
    pub fn new(transport: T, host: impl Into<String>, port: u16, secure: bool) -> Self {
        Self {
            transport,
            host: host.into(),
            port,
            secure,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            last_used: None,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn set_idle_timeout(&mut self, idle_timeout: Duration) {
        self.idle_timeout = idle_timeout;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Point at a different host/port. Closes the current stream.
    pub fn retarget(&mut self, host: impl Into<String>, port: u16) {
        self.disconnect();
        self.host = host.into();
        self.port = port;
    }

    /// Close the transport and drop any buffered bytes.
    pub fn disconnect(&mut self) {
        self.transport.close();
        self.read_buf.clear();
        self.last_used = None;
    }

    /// Send the request and read the complete response.
    pub fn send(&mut self, request: &RequestBuilder) -> Result<Response> {
        let result = self.exchange(request);
        match &result {
            Ok(response) if response.closes_connection() => {
                debug!("server closes connection after response");
                self.disconnect();
            }
            Ok(_) => {
                if self.transport.is_connected() {
                    self.last_used = Some(Instant::now());
                } else {
                    self.disconnect();
                }
            }
            Err(e) => {
                warn!(host = %self.host, port = self.port, error = %e, "HTTP exchange failed; closing transport");
                self.disconnect();
            }
        }
        result
    }

    fn ensure_connected(&mut self) -> Result<()> {
        if self.transport.is_connected() {
            let idle = self
                .last_used
                .map_or(false, |t| t.elapsed() > self.idle_timeout);
            if !idle {
                return Ok(());
            }
            debug!("kept-alive stream idle too long; reconnecting");
            self.disconnect();
        }
        self.read_buf.clear();
        debug!(host = %self.host, port = self.port, "connecting");
        self.transport
            .connect(&self.host, self.port)
            .map_err(|source| ConnectionError::Connect {
                host: self.host.clone(),
                port: self.port,
                source,
            })
    }

    fn exchange(&mut self, request: &RequestBuilder) -> Result<Response> {
        self.ensure_connected()?;
        let head = request.head_bytes(&host_header(&self.host, self.port, self.secure));
        self.transport.write_all(&head)?;
        if let Some(body) = request.body.as_deref().filter(|b| !b.is_empty()) {
            self.transport.write_all(body)?;
        }
        self.receive_response()
    }

    /// Read until the parser reports a complete response.
    fn receive_response(&mut self) -> Result<Response> {
        let mut parser = ResponseParser::new();
        let mut response = Response::default();
        let mut tmp = [0u8; READ_CHUNK];
        loop {
            parser.receive(&mut self.read_buf, &mut response)?;
            if parser.state() == ParseState::HeadersComplete {
                if response.is_informational() {
                    trace!(code = response.code, "skipping interim response");
                    parser.reset();
                    response = Response::default();
                } else {
                    parser.set_body_mode(body_mode(&response)?);
                }
                continue;
            }
            if parser.is_complete() {
                if !self.read_buf.is_empty() {
                    // No pipelining, so anything past the response breaks framing.
                    warn!(
                        extra_bytes = self.read_buf.len(),
                        "bytes after end of response; dropping stream"
                    );
                    self.read_buf.clear();
                    self.transport.close();
                }
                return Ok(response);
            }
            let n = self.transport.read(&mut tmp)?;
            if n == 0 {
                parser.finish()?;
                self.transport.close();
                return Ok(response);
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
    }
}

impl<T: Transport> Drop for HttpConnection<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

/// Decide how the body is delimited from status and headers.
fn body_mode(response: &Response) -> Result<BodyMode> {
    if response.is_bodiless_status() {
        return Ok(BodyMode::Empty);
    }
    if let Some(te) = response.header("Transfer-Encoding") {
        let codings: Vec<&str> = te
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("identity"))
            .collect();
        match codings.as_slice() {
            [] => {}
            [c] if c.eq_ignore_ascii_case("chunked") => return Ok(BodyMode::Chunked),
            _ => {
                return Err(ConnectionError::protocol(format!(
                    "unsupported transfer encoding {:?}",
                    te
                )))
            }
        }
    }
    if let Some(cl) = response.header("Content-Length") {
        let n = cl.trim().parse::<u64>().map_err(|_| {
            ConnectionError::protocol(format!("invalid Content-Length {:?}", cl))
        })?;
        return Ok(BodyMode::Length(n));
    }
    Ok(BodyMode::UntilClose)
}
