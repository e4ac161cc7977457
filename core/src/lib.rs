/*
 * lib.rs
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

//! Client for the OpenML REST API.
//!
//! A [`Connection`] owns one persistent HTTPS stream to the OpenML server and
//! exposes `get`, `post` and `del`, each returning the response as a
//! `serde_json::Value`. Parameters are ordered name/value lists ([`ParamList`]);
//! file parameters turn a POST into `multipart/form-data`.
//!
//! ```no_run
//! use openml_core::{Connection, ParamList};
//!
//! let conn = Connection::new();
//! conn.set_key("0123456789abcdef");
//! let tasks = conn.get("/task/list/limit/10", &ParamList::new())?;
//! # Ok::<(), openml_core::ConnectionError>(())
//! ```

pub mod config;
pub mod error;
pub mod net;
pub mod params;
pub mod protocol;
pub mod transport;

pub use config::ConnectionConfig;
pub use error::{ConnectionError, Result};
pub use net::SecureTransport;
pub use params::{Param, ParamList};
pub use protocol::openml::{Connection, Endpoint};
pub use serde_json::Value;
pub use transport::Transport;
