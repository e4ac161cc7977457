/*
 * mod.rs
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

//! OpenML REST API (JSON endpoint).
//!
//! A single persistent HTTPS connection to the OpenML server, shared by any
//! number of threads. Each `get`/`post`/`del` holds the connection for the
//! whole request/response cycle, so exchanges never interleave on the wire.
//! Higher-level objects (tasks, datasets, flows, runs) are built on top by
//! callers and receive plain `serde_json::Value`s.

mod connection;

pub use connection::Connection;

use crate::error::{ConnectionError, Result};

pub const PRODUCTION_HOST: &str = "www.openml.org";
pub const TEST_HOST: &str = "test.openml.org";
pub const DEFAULT_PORT: u16 = 443;
pub const API_PREFIX: &str = "/api/v1/json";

/// Name of the parameter carrying the API key on authenticated calls.
pub const API_KEY_PARAM: &str = "api_key";

/// Where requests go: host, port, and the path prefix put in front of every REST path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub prefix: String,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, prefix: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            prefix: prefix.into(),
        }
    }

    pub fn production() -> Self {
        Self::new(PRODUCTION_HOST, DEFAULT_PORT, API_PREFIX)
    }

    pub fn test_server() -> Self {
        Self::new(TEST_HOST, DEFAULT_PORT, API_PREFIX)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.host.is_empty() || self.host.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(ConnectionError::invalid_parameter(format!(
                "invalid host {:?}",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(ConnectionError::invalid_parameter("port must be in 1..=65535"));
        }
        if !self.prefix.is_empty() && !self.prefix.starts_with('/') {
            return Err(ConnectionError::invalid_parameter(format!(
                "path prefix {:?} must start with '/'",
                self.prefix
            )));
        }
        Ok(())
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_validation() {
        assert!(Endpoint::production().validate().is_ok());
        assert!(Endpoint::new("localhost", 8080, "").validate().is_ok());
        assert!(Endpoint::new("", 443, "").validate().is_err());
        assert!(Endpoint::new("h", 0, "").validate().is_err());
        assert!(Endpoint::new("h", 443, "api").validate().is_err());
        assert!(Endpoint::new("a b", 443, "").validate().is_err());
    }
}
