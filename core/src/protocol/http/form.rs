/*
 * form.rs
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

//! Request payload encodings: `application/x-www-form-urlencoded` (also used for
//! query strings) and `multipart/form-data`. Both emit parameters in list order.

use std::io;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{ConnectionError, Result};
use crate::params::Param;

/// Everything except the RFC 3986 unreserved characters is escaped.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

const BOUNDARY_PREFIX: &str = "----openml-";
const BOUNDARY_RANDOM_BYTES: usize = 16;

/// Percent-encode one name or value.
pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, UNRESERVED).to_string()
}

/// `name=value&name=value`. File parameters cannot be URL-encoded.
pub fn url_encode<'a, I>(params: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Param>,
{
    let mut out = String::new();
    for param in params {
        match param {
            Param::Field { name, value } => {
                if !out.is_empty() {
                    out.push('&');
                }
                out.push_str(&encode_component(name));
                out.push('=');
                out.push_str(&encode_component(value));
            }
            Param::File { name, .. } => {
                return Err(ConnectionError::invalid_parameter(format!(
                    "file parameter {:?} can only be sent in a POST request",
                    name
                )))
            }
        }
    }
    Ok(out)
}

/// An encoded `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct Multipart {
    pub boundary: String,
    pub body: Vec<u8>,
}

impl Multipart {
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

/// Encode with a fresh random boundary that occurs nowhere in the parameters.
pub fn encode_multipart<'a, I>(params: I) -> Result<Multipart>
where
    I: IntoIterator<Item = &'a Param> + Clone,
{
    loop {
        let boundary = generate_boundary()?;
        if !boundary_collides(params.clone(), &boundary) {
            return encode_multipart_with_boundary(params.clone(), &boundary);
        }
    }
}

/// Encode with a caller-chosen boundary. Fails on an invalid file parameter or if the
/// boundary occurs in any parameter.
pub fn encode_multipart_with_boundary<'a, I>(params: I, boundary: &str) -> Result<Multipart>
where
    I: IntoIterator<Item = &'a Param> + Clone,
{
    if boundary.is_empty() || boundary.len() > 70 {
        return Err(ConnectionError::invalid_parameter(
            "multipart boundary must be 1 to 70 characters",
        ));
    }
    for param in params.clone() {
        param.validate()?;
    }
    if boundary_collides(params.clone(), boundary) {
        return Err(ConnectionError::invalid_parameter(
            "multipart boundary occurs in the request content",
        ));
    }
    let mut body = Vec::new();
    for param in params {
        body.extend_from_slice(b"--");
        body.extend_from_slice(boundary.as_bytes());
        body.extend_from_slice(b"\r\n");
        match param {
            Param::Field { name, value } => {
                append_header(
                    &mut body,
                    "Content-Disposition",
                    &format!("form-data; name=\"{}\"", escape_quoted(name)),
                );
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(value.as_bytes());
            }
            Param::File {
                name,
                mime_type,
                filename,
                content,
            } => {
                append_header(
                    &mut body,
                    "Content-Disposition",
                    &format!(
                        "form-data; name=\"{}\"; filename=\"{}\"",
                        escape_quoted(name),
                        escape_quoted(filename)
                    ),
                );
                append_header(&mut body, "Content-Type", mime_type);
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(b"--");
    body.extend_from_slice(boundary.as_bytes());
    body.extend_from_slice(b"--\r\n");
    Ok(Multipart {
        boundary: boundary.to_string(),
        body,
    })
}

fn append_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// Quoted-string content in Content-Disposition, escaped the way browsers do.
fn escape_quoted(s: &str) -> String {
    s.replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn generate_boundary() -> Result<String> {
    let mut bytes = [0u8; BOUNDARY_RANDOM_BYTES];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| ConnectionError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))?;
    let mut boundary = String::with_capacity(BOUNDARY_PREFIX.len() + 2 * BOUNDARY_RANDOM_BYTES);
    boundary.push_str(BOUNDARY_PREFIX);
    for b in bytes {
        boundary.push_str(&format!("{:02x}", b));
    }
    Ok(boundary)
}

fn boundary_collides<'a, I>(params: I, boundary: &str) -> bool
where
    I: IntoIterator<Item = &'a Param>,
{
    let needle = boundary.as_bytes();
    params.into_iter().any(|param| match param {
        Param::Field { name, value } => {
            contains(name.as_bytes(), needle) || contains(value.as_bytes(), needle)
        }
        Param::File {
            name,
            mime_type,
            filename,
            content,
        } => {
            contains(name.as_bytes(), needle)
                || contains(mime_type.as_bytes(), needle)
                || contains(filename.as_bytes(), needle)
                || contains(content, needle)
        }
    })
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack.windows(needle.len()).any(|w| w == needle)
}
