/*
 * parser.rs
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

//! HTTP/1.1 response push parser: status line, headers, body (Content-Length, chunked, or until close).

use bytes::Buf;
use bytes::BytesMut;

use crate::error::{ConnectionError, Result};

/// Upper bound on status line plus header block.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Upper bound on one chunk-size line, extensions included.
pub const MAX_CHUNK_LINE: usize = 4096;

/// Callback for HTTP/1.1 response events.
pub trait H1ResponseHandler {
    fn status(&mut self, code: u16, reason: Option<&str>);
    fn header(&mut self, name: &str, value: &str);
    fn body_chunk(&mut self, data: &[u8]);
    fn trailer(&mut self, name: &str, value: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    StatusLine,
    Headers,
    /// Headers done; the caller must call `set_body_mode`.
    HeadersComplete,
    Body,
    BodyUntilClose,
    ChunkSize,
    ChunkData,
    ChunkDataEnd,
    ChunkTrailer,
    /// Response complete.
    Idle,
}

/// How the body of the current response is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    Empty,
    Length(u64),
    Chunked,
    UntilClose,
}

/// Push parser for one HTTP/1.1 response. Feed bytes via `receive`; call `finish` on end of stream.
pub struct ResponseParser {
    state: ParseState,
    /// Bytes still expected for a Content-Length body or the current chunk.
    remaining: u64,
    /// Content-Length as declared, for error messages.
    declared: u64,
    head_bytes: usize,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::StatusLine,
            remaining: 0,
            declared: 0,
            head_bytes: 0,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == ParseState::Idle
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Find CRLF in buf; return the offset of the CR, or None if not found.
    fn find_crlf(buf: &[u8]) -> Option<usize> {
        buf.windows(2).position(|w| w == b"\r\n")
    }

    /// Split one CRLF-terminated head line off `buf`, enforcing MAX_HEAD_BYTES.
    fn take_head_line(&mut self, buf: &mut BytesMut) -> Result<Option<String>> {
        let line_end = match Self::find_crlf(buf) {
            Some(n) => n,
            None => {
                if self.head_bytes + buf.len() > MAX_HEAD_BYTES {
                    return Err(ConnectionError::protocol("response header block too large"));
                }
                return Ok(None);
            }
        };
        self.head_bytes += line_end + 2;
        if self.head_bytes > MAX_HEAD_BYTES {
            return Err(ConnectionError::protocol("response header block too large"));
        }
        let line = buf.split_to(line_end + 2);
        let text = std::str::from_utf8(&line[..line_end])
            .map_err(|_| ConnectionError::protocol("response head is not valid UTF-8"))?;
        Ok(Some(text.to_string()))
    }

    /// Consume and parse as much as possible from buf. Partial data remains in buf.
    pub fn receive<H: H1ResponseHandler>(&mut self, buf: &mut BytesMut, handler: &mut H) -> Result<()> {
        while !buf.is_empty() {
            match self.state {
                ParseState::StatusLine => {
                    let line = match self.take_head_line(buf)? {
                        Some(l) => l,
                        None => return Ok(()),
                    };
                    let (code, reason) = parse_status_line(&line)?;
                    handler.status(code, reason);
                    self.state = ParseState::Headers;
                }
                ParseState::Headers => {
                    let line = match self.take_head_line(buf)? {
                        Some(l) => l,
                        None => return Ok(()),
                    };
                    if line.is_empty() {
                        self.state = ParseState::HeadersComplete;
                        return Ok(());
                    }
                    let (name, value) = parse_field_line(&line)?;
                    handler.header(name, value);
                }
                ParseState::HeadersComplete | ParseState::Idle => return Ok(()),
                ParseState::Body => {
                    let to_read = (self.remaining.min(buf.len() as u64)) as usize;
                    let chunk = buf.split_to(to_read);
                    handler.body_chunk(&chunk);
                    self.remaining -= to_read as u64;
                    if self.remaining == 0 {
                        self.state = ParseState::Idle;
                    }
                }
                ParseState::BodyUntilClose => {
                    let chunk = buf.split_to(buf.len());
                    handler.body_chunk(&chunk);
                }
                ParseState::ChunkSize => {
                    let line_end = match Self::find_crlf(buf) {
                        Some(n) if n <= MAX_CHUNK_LINE => n,
                        None if buf.len() <= MAX_CHUNK_LINE => return Ok(()),
                        _ => return Err(ConnectionError::protocol("chunk size line too long")),
                    };
                    let line = buf.split_to(line_end + 2);
                    let line_str = std::str::from_utf8(&line[..line_end])
                        .map_err(|_| ConnectionError::protocol("invalid chunk size line"))?;
                    let hex_part = line_str.split(';').next().unwrap_or(line_str).trim();
                    self.remaining = u64::from_str_radix(hex_part, 16).map_err(|_| {
                        ConnectionError::protocol(format!("invalid chunk size {:?}", hex_part))
                    })?;
                    self.state = if self.remaining == 0 {
                        ParseState::ChunkTrailer
                    } else {
                        ParseState::ChunkData
                    };
                }
                ParseState::ChunkData => {
                    let to_read = (self.remaining.min(buf.len() as u64)) as usize;
                    let chunk = buf.split_to(to_read);
                    handler.body_chunk(&chunk);
                    self.remaining -= to_read as u64;
                    if self.remaining == 0 {
                        self.state = ParseState::ChunkDataEnd;
                    }
                }
                ParseState::ChunkDataEnd => {
                    if buf.len() < 2 {
                        return Ok(());
                    }
                    if &buf[..2] != b"\r\n" {
                        return Err(ConnectionError::protocol("chunk data not followed by CRLF"));
                    }
                    buf.advance(2);
                    self.state = ParseState::ChunkSize;
                }
                ParseState::ChunkTrailer => {
                    // Trailers share the head block's size limit.
                    let line = match self.take_head_line(buf)? {
                        Some(l) => l,
                        None => return Ok(()),
                    };
                    if line.is_empty() {
                        self.state = ParseState::Idle;
                    } else {
                        let (name, value) = parse_field_line(&line)?;
                        handler.trailer(name, value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Called once after headers are received (state HeadersComplete).
    pub fn set_body_mode(&mut self, mode: BodyMode) {
        if self.state != ParseState::HeadersComplete {
            return;
        }
        self.state = match mode {
            BodyMode::Empty | BodyMode::Length(0) => ParseState::Idle,
            BodyMode::Length(n) => {
                self.remaining = n;
                self.declared = n;
                ParseState::Body
            }
            BodyMode::Chunked => ParseState::ChunkSize,
            BodyMode::UntilClose => ParseState::BodyUntilClose,
        };
    }

    /// The stream ended. Completes a close-delimited body; anything else unfinished is an error.
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            ParseState::Idle => Ok(()),
            ParseState::BodyUntilClose => {
                self.state = ParseState::Idle;
                Ok(())
            }
            ParseState::StatusLine if self.head_bytes == 0 => Err(ConnectionError::protocol(
                "connection closed before any response was received",
            )),
            ParseState::StatusLine | ParseState::Headers | ParseState::HeadersComplete => Err(
                ConnectionError::protocol("connection closed before response headers were complete"),
            ),
            ParseState::Body => Err(ConnectionError::protocol(format!(
                "connection closed after {} of {} body bytes",
                self.declared - self.remaining,
                self.declared
            ))),
            ParseState::ChunkSize
            | ParseState::ChunkData
            | ParseState::ChunkDataEnd
            | ParseState::ChunkTrailer => Err(ConnectionError::protocol(
                "connection closed inside chunked body",
            )),
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// `HTTP/1.x SP 3DIGIT [SP reason]`
fn parse_status_line(line: &str) -> Result<(u16, Option<&str>)> {
    let malformed = || ConnectionError::protocol(format!("malformed status line {:?}", line));
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().ok_or_else(malformed)?;
    if !version.starts_with("HTTP/1.") {
        return Err(malformed());
    }
    let code_str = parts.next().ok_or_else(malformed)?;
    if code_str.len() != 3 || !code_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let code: u16 = code_str.parse().map_err(|_| malformed())?;
    if !(100..600).contains(&code) {
        return Err(malformed());
    }
    let reason = parts.next().filter(|r| !r.is_empty());
    Ok((code, reason))
}

/// `name ":" OWS value OWS`
fn parse_field_line(line: &str) -> Result<(&str, &str)> {
    if line.starts_with(' ') || line.starts_with('\t') {
        return Err(ConnectionError::protocol("obsolete header line folding"));
    }
    let colon = line
        .find(':')
        .ok_or_else(|| ConnectionError::protocol(format!("malformed header line {:?}", line)))?;
    let name = &line[..colon];
    if name.is_empty() || name.chars().any(|c| c.is_whitespace()) {
        return Err(ConnectionError::protocol(format!("malformed header name {:?}", name)));
    }
    Ok((name, line[colon + 1..].trim()))
}
