/*
 * error.rs
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

//! Connection errors.
//!
//! A non-2xx HTTP status is not an error: `Connection::get` and friends return
//! it as a JSON number. Everything here means the exchange itself failed and
//! the transport has been closed.

use std::io;

/// Errors from `Connection` operations and the layers beneath it.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Could not resolve, connect, or complete the TLS handshake.
    #[error("connecting to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: io::Error,
    },

    /// Read or write on an established transport failed (including timeouts).
    #[error("transport I/O: {0}")]
    Io(#[from] io::Error),

    /// The server's bytes do not form an HTTP/1.1 response we can accept.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A 2xx response body is not valid JSON.
    #[error("invalid JSON in response body: {0}")]
    Parse(#[from] serde_json::Error),

    /// The caller's parameters or endpoint are unusable; nothing was sent.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration file missing or malformed.
    #[error("configuration: {0}")]
    Config(String),
}

impl ConnectionError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub(crate) fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// True when the server could not be reached at all, as opposed to
    /// replying with something unusable.
    pub fn is_connect(&self) -> bool {
        matches!(self, ConnectionError::Connect { .. })
    }

    /// True for errors caused by the caller's input rather than the network.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, ConnectionError::InvalidParameter(_))
    }
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
