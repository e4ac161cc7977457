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

//! C FFI for openml core. A connection is an opaque handle from
//! openml_connection_new / openml_connection_new_default, freed with
//! openml_connection_free. Handles may be shared between threads.
//!
//! All string parameters are UTF-8 NUL-terminated. Request parameters are
//! passed as parallel arrays: `names[i]` (NUL-terminated, `field|mime[|filename]`
//! marks a file) and `values[i]` with length `value_lens[i]` (may contain NUL).
//! Calls return the response as newly allocated JSON text (free with
//! openml_free_string): the parsed body for a 2xx status, otherwise the status
//! number, e.g. `404`. On failure they return NULL and set the last error.

use libc::{c_char, c_int, size_t};
use openml_core::{Connection, ConnectionConfig, ConnectionError, Endpoint, ParamList};
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::ptr;
use std::slice;
use tracing::debug;

/// Opaque connection handle.
pub struct OpenmlConnection(Connection);

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = RefCell::new(None);
}

fn set_last_error(msg: impl ToString) {
    let msg = CString::new(msg.to_string().replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

fn ptr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok() }
}

fn into_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c) => c.into_raw(),
        Err(_) => {
            set_last_error("result contains a NUL byte");
            ptr::null_mut()
        }
    }
}

fn handle<'a>(conn: *const OpenmlConnection) -> Option<&'a Connection> {
    if conn.is_null() {
        set_last_error("connection is null");
        return None;
    }
    Some(unsafe { &(*conn).0 })
}

/// Build the parameter list from the C arrays.
///
/// # Safety
/// Each array must hold `count` valid entries (arrays may be NULL when `count` is 0).
unsafe fn collect_params(
    names: *const *const c_char,
    values: *const *const u8,
    value_lens: *const size_t,
    count: size_t,
) -> Result<ParamList, ConnectionError> {
    let mut params = ParamList::new();
    if count == 0 {
        return Ok(params);
    }
    if names.is_null() || values.is_null() || value_lens.is_null() {
        return Err(ConnectionError::InvalidParameter(
            "parameter arrays are null".into(),
        ));
    }
    let names = slice::from_raw_parts(names, count);
    let values = slice::from_raw_parts(values, count);
    let lens = slice::from_raw_parts(value_lens, count);
    for i in 0..count {
        let name = ptr_to_str(names[i]).ok_or_else(|| {
            ConnectionError::InvalidParameter(format!("parameter name {} is null or not valid UTF-8", i))
        })?;
        let value = match (values[i].is_null(), lens[i]) {
            (_, 0) => Vec::new(),
            (true, _) => {
                return Err(ConnectionError::InvalidParameter(format!(
                    "value of parameter {:?} is null",
                    name
                )))
            }
            (false, len) => slice::from_raw_parts(values[i], len).to_vec(),
        };
        params.push_pair(name, value)?;
    }
    Ok(params)
}

/// Version string (static, do not free).
#[no_mangle]
pub extern "C" fn openml_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Last error message from a failed call on this thread. Valid until the next FFI call. Do not free.
#[no_mangle]
pub extern "C" fn openml_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Free a string returned by openml_connection_key or a request function. No-op if ptr is NULL.
#[no_mangle]
pub unsafe extern "C" fn openml_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        let _ = CString::from_raw(ptr);
    }
}

/// Connection to the production OpenML server over HTTPS. Never NULL.
#[no_mangle]
pub extern "C" fn openml_connection_new_default() -> *mut OpenmlConnection {
    clear_last_error();
    Box::into_raw(Box::new(OpenmlConnection(Connection::new())))
}

/// Connection to host:port. prefix may be NULL for the standard API prefix.
/// use_tls: nonzero for HTTPS. Returns NULL on invalid arguments.
#[no_mangle]
pub extern "C" fn openml_connection_new(
    host: *const c_char,
    port: u16,
    prefix: *const c_char,
    use_tls: c_int,
) -> *mut OpenmlConnection {
    let host = match ptr_to_str(host) {
        Some(h) => h,
        None => {
            set_last_error("host is null or not valid UTF-8");
            return ptr::null_mut();
        }
    };
    let prefix = if prefix.is_null() {
        Endpoint::production().prefix
    } else {
        match ptr_to_str(prefix) {
            Some(p) => p.to_string(),
            None => {
                set_last_error("prefix is not valid UTF-8");
                return ptr::null_mut();
            }
        }
    };
    let config = ConnectionConfig {
        host: host.to_string(),
        port,
        prefix,
        use_tls: use_tls != 0,
        ..ConnectionConfig::default()
    };
    match Connection::from_config(&config) {
        Ok(conn) => {
            clear_last_error();
            debug!(host, port, tls = config.use_tls, "FFI connection created");
            Box::into_raw(Box::new(OpenmlConnection(conn)))
        }
        Err(e) => {
            set_last_error(e);
            ptr::null_mut()
        }
    }
}

/// Close and free a connection. No-op if conn is NULL. No other call may be using it.
#[no_mangle]
pub unsafe extern "C" fn openml_connection_free(conn: *mut OpenmlConnection) {
    if !conn.is_null() {
        drop(Box::from_raw(conn));
    }
}

/// Set the API key; NULL or "" clears it. Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn openml_connection_set_key(conn: *const OpenmlConnection, key: *const c_char) -> c_int {
    let Some(conn) = handle(conn) else { return -1 };
    if key.is_null() {
        conn.set_key("");
    } else {
        match ptr_to_str(key) {
            Some(k) => conn.set_key(k),
            None => {
                set_last_error("key is not valid UTF-8");
                return -1;
            }
        }
    }
    clear_last_error();
    0
}

/// Current API key (caller frees with openml_free_string). NULL if conn is NULL.
#[no_mangle]
pub extern "C" fn openml_connection_key(conn: *const OpenmlConnection) -> *mut c_char {
    let Some(conn) = handle(conn) else { return ptr::null_mut() };
    clear_last_error();
    into_c_string(conn.key())
}

/// Send all further requests to the OpenML test server.
#[no_mangle]
pub extern "C" fn openml_connection_enable_test_mode(conn: *const OpenmlConnection) {
    if let Some(conn) = handle(conn) {
        clear_last_error();
        conn.enable_test_mode();
    }
}

#[derive(Clone, Copy)]
enum Verb {
    Get,
    Post,
    Delete,
}

unsafe fn request(
    verb: Verb,
    conn: *const OpenmlConnection,
    path: *const c_char,
    names: *const *const c_char,
    values: *const *const u8,
    value_lens: *const size_t,
    count: size_t,
) -> *mut c_char {
    let Some(conn) = handle(conn) else { return ptr::null_mut() };
    let Some(path) = ptr_to_str(path) else {
        set_last_error("path is null or not valid UTF-8");
        return ptr::null_mut();
    };
    let result = collect_params(names, values, value_lens, count).and_then(|params| match verb {
        Verb::Get => conn.get(path, &params),
        Verb::Post => conn.post(path, &params),
        Verb::Delete => conn.del(path, &params),
    });
    match result {
        Ok(value) => {
            clear_last_error();
            into_c_string(value.to_string())
        }
        Err(e) => {
            set_last_error(e);
            ptr::null_mut()
        }
    }
}

/// HTTP GET; parameters go in the query string.
///
/// # Safety
/// See the module documentation for the parameter arrays.
#[no_mangle]
pub unsafe extern "C" fn openml_connection_get(
    conn: *const OpenmlConnection,
    path: *const c_char,
    names: *const *const c_char,
    values: *const *const u8,
    value_lens: *const size_t,
    count: size_t,
) -> *mut c_char {
    request(Verb::Get, conn, path, names, values, value_lens, count)
}

/// HTTP POST; multipart/form-data when any name carries a MIME type, else form-urlencoded.
///
/// # Safety
/// See the module documentation for the parameter arrays.
#[no_mangle]
pub unsafe extern "C" fn openml_connection_post(
    conn: *const OpenmlConnection,
    path: *const c_char,
    names: *const *const c_char,
    values: *const *const u8,
    value_lens: *const size_t,
    count: size_t,
) -> *mut c_char {
    request(Verb::Post, conn, path, names, values, value_lens, count)
}

/// HTTP DELETE; parameters go in the query string.
///
/// # Safety
/// See the module documentation for the parameter arrays.
#[no_mangle]
pub unsafe extern "C" fn openml_connection_delete(
    conn: *const OpenmlConnection,
    path: *const c_char,
    names: *const *const c_char,
    values: *const *const u8,
    value_lens: *const size_t,
    count: size_t,
) -> *mut c_char {
    request(Verb::Delete, conn, path, names, values, value_lens, count)
}
