/*
 * config.rs
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

//! Connection settings, loadable from a TOML file and overridable from the environment.
//!
//! ```toml
//! host = "www.openml.org"
//! port = 443
//! prefix = "/api/v1/json"
//! api_key = "0123456789abcdef"
//! use_tls = true
//! connect_timeout_secs = 15
//! read_timeout_secs = 60
//! keep_alive_idle_secs = 4
//! ```
//!
//! Every key is optional; missing keys take the production defaults.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConnectionError, Result};
use crate::net::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};
use crate::protocol::http::connection::DEFAULT_IDLE_TIMEOUT;
use crate::protocol::openml::{Endpoint, API_PREFIX, DEFAULT_PORT, PRODUCTION_HOST};

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "OPENML_APIKEY";
/// Environment variable holding `host` or `host:port`.
pub const ENV_SERVER: &str = "OPENML_SERVER";

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub prefix: String,
    /// Empty means unauthenticated.
    pub api_key: String,
    pub use_tls: bool,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub keep_alive_idle_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: PRODUCTION_HOST.to_string(),
            port: DEFAULT_PORT,
            prefix: API_PREFIX.to_string(),
            api_key: String::new(),
            use_tls: true,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            read_timeout_secs: DEFAULT_READ_TIMEOUT.as_secs(),
            keep_alive_idle_secs: DEFAULT_IDLE_TIMEOUT.as_secs(),
        }
    }
}

// The API key stays out of logs.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("prefix", &self.prefix)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("use_tls", &self.use_tls)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("keep_alive_idle_secs", &self.keep_alive_idle_secs)
            .finish()
    }
}

impl ConnectionConfig {
    /// Defaults pointed at the OpenML test server.
    pub fn test_server() -> Self {
        let endpoint = Endpoint::test_server();
        Self {
            host: endpoint.host,
            port: endpoint.port,
            prefix: endpoint.prefix,
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| ConnectionError::Config(format!("parsing TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConnectionError::Config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Apply `OPENML_APIKEY` and `OPENML_SERVER` from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = key.trim().to_string();
        }
        if let Some(server) = lookup(ENV_SERVER) {
            let server = server.trim();
            match server.rsplit_once(':') {
                Some((host, port)) => {
                    self.host = host.to_string();
                    self.port = port.parse().map_err(|_| {
                        ConnectionError::Config(format!("{}: invalid port in {:?}", ENV_SERVER, server))
                    })?;
                }
                None => self.host = server.to_string(),
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(ConnectionError::Config("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ConnectionError::Config("port must be in 1..=65535".into()));
        }
        if self.read_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ConnectionError::Config("timeouts must be at least one second".into()));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port,
            prefix: self.prefix.clone(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn keep_alive_idle(&self) -> Duration {
        Duration::from_secs(self.keep_alive_idle_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_is_production_default() {
        let cfg = ConnectionConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ConnectionConfig::default());
        assert_eq!(cfg.host, "www.openml.org");
        assert_eq!(cfg.port, 443);
        assert_eq!(cfg.prefix, "/api/v1/json");
        assert!(cfg.use_tls);
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let cfg = ConnectionConfig::from_toml_str(
            r#"
            host = "localhost"
            port = 8080
            use_tls = false
            api_key = "abc"
            read_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.endpoint(), Endpoint::new("localhost", 8080, "/api/v1/json"));
        assert!(!cfg.use_tls);
        assert_eq!(cfg.api_key, "abc");
        assert_eq!(cfg.read_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn invalid_toml_rejected() {
        assert!(ConnectionConfig::from_toml_str("port = 0").is_err());
        assert!(ConnectionConfig::from_toml_str("port = 70000").is_err());
        assert!(ConnectionConfig::from_toml_str("unknown_key = 1").is_err());
        assert!(ConnectionConfig::from_toml_str("host = \"\"").is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key = \"secret\"").unwrap();
        let cfg = ConnectionConfig::load(file.path()).unwrap();
        assert_eq!(cfg.api_key, "secret");

        let missing = ConnectionConfig::load("/nonexistent/openml.toml").unwrap_err();
        assert!(matches!(missing, ConnectionError::Config(_)));
    }

    #[test]
    fn overrides_from_environment_source() {
        let cfg = ConnectionConfig::default()
            .with_overrides_from(|name| match name {
                ENV_API_KEY => Some(" k3y \n".into()),
                ENV_SERVER => Some("test.openml.org:8443".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(cfg.api_key, "k3y");
        assert_eq!(cfg.host, "test.openml.org");
        assert_eq!(cfg.port, 8443);

        let err = ConnectionConfig::default()
            .with_overrides_from(|name| (name == ENV_SERVER).then(|| "h:notaport".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Config(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = ConnectionConfig {
            api_key: "topsecret".into(),
            ..ConnectionConfig::default()
        };
        let shown = format!("{:?}", cfg);
        assert!(!shown.contains("topsecret"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn test_server_preset() {
        let cfg = ConnectionConfig::test_server();
        assert_eq!(cfg.host, "test.openml.org");
        assert_eq!(cfg.prefix, "/api/v1/json");
    }
}
