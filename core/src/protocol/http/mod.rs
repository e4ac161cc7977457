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

//! HTTP/1.1 client over a blocking `Transport`.
//!
//! - Requests are framed by hand (`RequestBuilder::head_bytes`), always with a Content-Length.
//! - Responses are push-parsed (`h1::ResponseParser`) into a `Response`: Content-Length,
//!   chunked, or read-until-close bodies.
//! - `form` encodes parameter lists as urlencoded query/form data or multipart/form-data.

mod request;
mod response;

pub mod connection;
pub mod form;
pub mod h1;

pub use connection::HttpConnection;
pub use request::{host_header, Method, RequestBuilder};
pub use response::Response;
