/*
 * response.rs
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

//! HTTP response: status, ordered headers, raw body.

use crate::protocol::http::h1::H1ResponseHandler;

/// A fully received HTTP response. Filled in by the H1 parser callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    pub reason: Option<String>,
    /// Header fields in arrival order; names as sent by the server.
    pub headers: Vec<(String, String)>,
    /// Logical body: de-chunked when the server used chunked encoding.
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// First value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True if a header's comma-separated value list contains `token` (case-insensitive).
    pub fn header_has_token(&self, name: &str, token: &str) -> bool {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .flat_map(|(_, v)| v.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    }

    /// True when the server announced it will close the connection after this response.
    pub fn closes_connection(&self) -> bool {
        self.header_has_token("Connection", "close")
    }

    /// Response status with no body regardless of headers (RFC 9112 §6.3).
    pub(crate) fn is_bodiless_status(&self) -> bool {
        self.is_informational() || self.code == 204 || self.code == 304
    }
}

impl H1ResponseHandler for Response {
    fn status(&mut self, code: u16, reason: Option<&str>) {
        self.code = code;
        self.reason = reason.map(|s| s.to_string());
    }

    fn header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn body_chunk(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    fn trailer(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }
}
