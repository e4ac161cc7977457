/*
 * params.rs
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

//! Request parameters: an ordered list, not a map. The OpenML API cares about order.
//!
//! File uploads are a separate variant. The string form `name|mime-type` or
//! `name|mime-type|filename` is only understood by [`ParamList::push_pair`]
//! and [`ParamList::from_pairs`], which translate it into [`Param::File`].

use crate::error::{ConnectionError, Result};

/// Separator between field name, MIME type and filename in a file marker.
pub const FILE_MARKER: char = '|';

/// One request parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// Form or query field.
    Field { name: String, value: String },
    /// File upload; only valid in POST requests, sent as a multipart part.
    File {
        name: String,
        mime_type: String,
        filename: String,
        content: Vec<u8>,
    },
}

impl Param {
    pub fn name(&self) -> &str {
        match self {
            Param::Field { name, .. } | Param::File { name, .. } => name,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Param::File { .. })
    }

    /// Parse a wire-style `(name, value)` pair, recognising the file marker in `name`.
    pub fn from_pair(name: &str, value: impl Into<Vec<u8>>) -> Result<Self> {
        let value = value.into();
        if !name.contains(FILE_MARKER) {
            let value = String::from_utf8(value).map_err(|_| {
                ConnectionError::invalid_parameter(format!("field {:?}: value is not UTF-8", name))
            })?;
            return Ok(Param::Field {
                name: name.to_string(),
                value,
            });
        }
        let parts: Vec<&str> = name.split(FILE_MARKER).collect();
        let (field, mime_type, filename) = match parts.as_slice() {
            [field, mime] => (*field, *mime, *field),
            [field, mime, filename] => (*field, *mime, *filename),
            _ => {
                return Err(ConnectionError::invalid_parameter(format!(
                    "file marker {:?}: expected name|mime-type[|filename]",
                    name
                )))
            }
        };
        let param = Param::File {
            name: field.to_string(),
            mime_type: mime_type.to_string(),
            filename: filename.to_string(),
            content: value,
        };
        param.validate()?;
        Ok(param)
    }

    /// Check a file parameter before it goes on the wire: non-empty field name,
    /// `type/subtype` MIME type, non-empty filename without control characters.
    /// Fields always pass; their names and values are escaped when encoded.
    pub fn validate(&self) -> Result<()> {
        let (name, mime_type, filename) = match self {
            Param::Field { .. } => return Ok(()),
            Param::File {
                name,
                mime_type,
                filename,
                ..
            } => (name, mime_type, filename),
        };
        if name.is_empty() {
            return Err(ConnectionError::invalid_parameter("file parameter has an empty field name"));
        }
        if !is_mime_type(mime_type) {
            return Err(ConnectionError::invalid_parameter(format!(
                "file parameter {:?}: missing or malformed MIME type {:?}",
                name, mime_type
            )));
        }
        if filename.is_empty() || filename.chars().any(char::is_control) {
            return Err(ConnectionError::invalid_parameter(format!(
                "file parameter {:?}: empty filename or control characters in {:?}",
                name, filename
            )));
        }
        Ok(())
    }
}

/// `type/subtype`, both non-empty, no whitespace.
fn is_mime_type(s: &str) -> bool {
    match s.split_once('/') {
        Some((ty, sub)) => {
            !ty.is_empty()
                && !sub.is_empty()
                && !s.chars().any(|c| c.is_whitespace() || c.is_control())
        }
        None => false,
    }
}

/// Ordered request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamList(Vec<Param>);

impl ParamList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from wire-style pairs; names may carry the file marker.
    pub fn from_pairs<I, N, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<Vec<u8>>,
    {
        let mut list = Self::new();
        for (name, value) in pairs {
            list.push_pair(name.as_ref(), value)?;
        }
        Ok(list)
    }

    /// Append a plain field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push(Param::Field {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a file upload. Checked with [`Param::validate`] when the request is built.
    pub fn file(
        mut self,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.0.push(Param::File {
            name: name.into(),
            mime_type: mime_type.into(),
            filename: filename.into(),
            content: content.into(),
        });
        self
    }

    /// Append a wire-style pair, parsing the file marker.
    pub fn push_pair(&mut self, name: &str, value: impl Into<Vec<u8>>) -> Result<&mut Self> {
        self.0.push(Param::from_pair(name, value)?);
        Ok(self)
    }

    pub fn push(&mut self, param: Param) -> &mut Self {
        self.0.push(param);
        self
    }

    pub fn has_files(&self) -> bool {
        self.0.iter().any(Param::is_file)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Param>> for ParamList {
    fn from(params: Vec<Param>) -> Self {
        Self(params)
    }
}

impl FromIterator<Param> for ParamList {
    fn from_iter<I: IntoIterator<Item = Param>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Param> for ParamList {
    fn extend<I: IntoIterator<Item = Param>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl<'a> IntoIterator for &'a ParamList {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
