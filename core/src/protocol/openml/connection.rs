/*
 * connection.rs
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

//! OpenML connection: API key, endpoint, and one mutex-guarded HTTP connection.

use std::sync::{Mutex, MutexGuard, RwLock};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, Result};
use crate::net::SecureTransport;
use crate::params::{Param, ParamList};
use crate::protocol::http::form::{self, FORM_URLENCODED};
use crate::protocol::http::{HttpConnection, Method, RequestBuilder, Response};
use crate::transport::Transport;

use super::{Endpoint, API_KEY_PARAM};

const USER_AGENT: &str = concat!("openml-rs/", env!("CARGO_PKG_VERSION"));

/// State touched only while an exchange holds the lock.
struct Exchange<T: Transport> {
    http: HttpConnection<T>,
    prefix: String,
}

/// Connection to the OpenML REST API.
///
/// Construct one explicitly and pass it (or an `Arc` of it) to whatever needs
/// it; there is no process-wide instance. All methods take `&self` and are
/// safe to call from many threads: requests are serialized on the single
/// underlying transport in lock-acquisition order.
///
/// # Return values
///
/// `get`, `post` and `del` return the parsed JSON body for 2xx responses.
/// For any other status they return the status code itself as a JSON number
/// (`Value::Number(404)`), not an error. This is intentional: `Err` means the
/// server could not be reached or replied with something that is not HTTP or
/// not JSON, while a number means the API answered and refused. Callers must
/// check the kind of the returned value.
pub struct Connection<T: Transport = SecureTransport> {
    key: RwLock<String>,
    exchange: Mutex<Exchange<T>>,
}

impl Connection<SecureTransport> {
    /// HTTPS connection to the production OpenML service. Nothing is opened until the first call.
    pub fn new() -> Self {
        let endpoint = Endpoint::production();
        Self::build(endpoint, SecureTransport::new(), true)
    }

    /// HTTPS connection to the given host, port and path prefix.
    pub fn with_endpoint(host: impl Into<String>, port: u16, prefix: impl Into<String>) -> Result<Self> {
        Self::with_transport(Endpoint::new(host, port, prefix), SecureTransport::new())
    }

    /// Connection built from configuration: endpoint, TLS mode, timeouts and API key.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = config.endpoint();
        endpoint.validate()?;
        let transport =
            SecureTransport::with_options(config.use_tls, config.connect_timeout(), config.read_timeout());
        let connection = Self::build(endpoint, transport, config.use_tls);
        connection.set_key(config.api_key.clone());
        connection.lock().http.set_idle_timeout(config.keep_alive_idle());
        Ok(connection)
    }
}

impl Default for Connection<SecureTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Connection<T> {
    /// Connection over a caller-supplied transport (TLS semantics assumed for the Host header).
    pub fn with_transport(endpoint: Endpoint, transport: T) -> Result<Self> {
        endpoint.validate()?;
        Ok(Self::build(endpoint, transport, true))
    }

    fn build(endpoint: Endpoint, transport: T, secure: bool) -> Self {
        Self {
            key: RwLock::new(String::new()),
            exchange: Mutex::new(Exchange {
                http: HttpConnection::new(transport, endpoint.host, endpoint.port, secure),
                prefix: endpoint.prefix,
            }),
        }
    }

    /// Lock the exchange state. A poisoned lock is recovered with a fresh transport.
    fn lock(&self) -> MutexGuard<'_, Exchange<T>> {
        self.exchange.lock().unwrap_or_else(|poisoned| {
            warn!("connection lock poisoned by a panicking caller; resetting transport");
            self.exchange.clear_poison();
            let mut guard = poisoned.into_inner();
            guard.http.disconnect();
            guard
        })
    }

    /// The API key currently sent with requests (empty if none).
    pub fn key(&self) -> String {
        match self.key.read() {
            Ok(k) => k.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Set the API key. An empty key makes subsequent calls unauthenticated.
    pub fn set_key(&self, api_key: impl Into<String>) {
        let api_key = api_key.into();
        match self.key.write() {
            Ok(mut k) => *k = api_key,
            Err(poisoned) => *poisoned.into_inner() = api_key,
        }
    }

    /// Host, port and prefix that the next call will use.
    pub fn endpoint(&self) -> Endpoint {
        let exchange = self.lock();
        Endpoint::new(exchange.http.host(), exchange.http.port(), exchange.prefix.clone())
    }

    /// Redirect subsequent calls. Waits for any in-flight exchange, then closes the transport.
    pub fn set_endpoint(&self, endpoint: Endpoint) -> Result<()> {
        endpoint.validate()?;
        let mut exchange = self.lock();
        debug!(host = %endpoint.host, port = endpoint.port, prefix = %endpoint.prefix, "endpoint changed");
        exchange.http.retarget(endpoint.host, endpoint.port);
        exchange.prefix = endpoint.prefix;
        Ok(())
    }

    /// Redirect all traffic to the OpenML test server. The next call reconnects.
    pub fn enable_test_mode(&self) {
        let test = Endpoint::test_server();
        info!(host = %test.host, port = test.port, "switching to the OpenML test server");
        let mut exchange = self.lock();
        exchange.http.retarget(test.host, test.port);
        exchange.prefix = test.prefix;
    }

    /// True while a kept-alive stream is open.
    pub fn is_connected(&self) -> bool {
        self.lock().http.is_connected()
    }

    /// Close the transport now; the next call reconnects.
    pub fn disconnect(&self) {
        self.lock().http.disconnect();
    }

    /// HTTP GET with URL-encoded query parameters.
    ///
    /// Returns the JSON body on 2xx, otherwise the status code as a JSON number.
    pub fn get(&self, path: &str, params: &ParamList) -> Result<Value> {
        self.call(Method::Get, path, params)
    }

    /// HTTP POST with a URL-encoded form body, or multipart/form-data when any parameter is a file.
    ///
    /// Returns the JSON body on 2xx, otherwise the status code as a JSON number.
    pub fn post(&self, path: &str, params: &ParamList) -> Result<Value> {
        self.call(Method::Post, path, params)
    }

    /// HTTP DELETE with URL-encoded query parameters.
    ///
    /// Returns the JSON body on 2xx, otherwise the status code as a JSON number.
    pub fn del(&self, path: &str, params: &ParamList) -> Result<Value> {
        self.call(Method::Delete, path, params)
    }

    fn call(&self, method: Method, path: &str, params: &ParamList) -> Result<Value> {
        let key = self.key();
        let mut exchange = self.lock();
        let request = build_request(method, &exchange.prefix, path, params, &key)?;
        let response = exchange.http.send(&request)?;
        debug!(
            method = method.as_str(),
            path,
            status = response.code,
            body_bytes = response.body.len(),
            "exchange complete"
        );
        json_result(&response).map_err(|e| {
            warn!(method = method.as_str(), path, error = %e, "unusable response body; closing transport");
            exchange.http.disconnect();
            e
        })
    }
}

/// Frame one API call. The API key, when set, goes last in the parameter list.
fn build_request(
    method: Method,
    prefix: &str,
    path: &str,
    params: &ParamList,
    api_key: &str,
) -> Result<RequestBuilder> {
    if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ConnectionError::invalid_parameter(format!(
            "request path {:?} contains whitespace or control characters",
            path
        )));
    }
    for param in params {
        param.validate()?;
    }
    let key_param = (!api_key.is_empty()).then(|| Param::Field {
        name: API_KEY_PARAM.to_string(),
        value: api_key.to_string(),
    });
    let all = params.iter().chain(key_param.iter());

    let mut target = String::with_capacity(prefix.len() + path.len() + 1);
    target.push_str(prefix);
    if !path.starts_with('/') {
        target.push('/');
    }
    target.push_str(path);

    let (content_type, body) = match method {
        Method::Get | Method::Delete => {
            let query = form::url_encode(all)?;
            if !query.is_empty() {
                target.push(if target.contains('?') { '&' } else { '?' });
                target.push_str(&query);
            }
            (None, None)
        }
        Method::Post if params.has_files() => {
            let multipart = form::encode_multipart(all)?;
            (Some(multipart.content_type()), Some(multipart.body))
        }
        Method::Post => {
            let body = form::url_encode(all)?;
            (Some(FORM_URLENCODED.to_string()), Some(body.into_bytes()))
        }
    };

    let mut request = RequestBuilder::new(method, target);
    request
        .header("User-Agent", USER_AGENT)
        .header("Accept", "application/json")
        .header("Connection", "keep-alive");
    if let Some(content_type) = content_type {
        request.header("Content-Type", content_type);
    }
    if let Some(body) = body {
        request.body(body);
    }
    Ok(request)
}

/// 2xx → parsed body (empty body is `null`); anything else → the status as a number.
fn json_result(response: &Response) -> Result<Value> {
    if !response.is_success() {
        return Ok(Value::from(response.code));
    }
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&response.body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(req: &RequestBuilder) -> String {
        let mut bytes = req.head_bytes("www.openml.org");
        if let Some(body) = &req.body {
            bytes.extend_from_slice(body);
        }
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn get_puts_params_and_key_in_query() {
        let params = ParamList::new().field("status", "active").field("limit", "10");
        let req = build_request(Method::Get, "/api/v1/json", "/data/list", &params, "k&y").unwrap();
        assert_eq!(req.target, "/api/v1/json/data/list?status=active&limit=10&api_key=k%26y");
        assert!(req.body.is_none());
    }

    #[test]
    fn get_without_params_or_key_has_bare_path() {
        let req = build_request(Method::Get, "", "data/61", &ParamList::new(), "").unwrap();
        assert_eq!(req.target, "/data/61");
    }

    #[test]
    fn existing_query_is_extended() {
        let params = ParamList::new().field("b", "2");
        let req = build_request(Method::Delete, "/p", "/x?a=1", &params, "").unwrap();
        assert_eq!(req.target, "/p/x?a=1&b=2");
        assert_eq!(req.method, Method::Delete);
    }

    #[test]
    fn plain_post_is_form_urlencoded() {
        let params = ParamList::new().field("name", "my flow");
        let req = build_request(Method::Post, "/api", "/flow/exists", &params, "key").unwrap();
        let t = text(&req);
        assert!(t.starts_with("POST /api/flow/exists HTTP/1.1\r\n"), "{}", t);
        assert!(t.contains("Content-Type: application/x-www-form-urlencoded\r\n"));
        assert!(t.ends_with("\r\n\r\nname=my%20flow&api_key=key"), "{}", t);
    }

    #[test]
    fn post_with_file_is_multipart_with_key_last() {
        let params = ParamList::from_pairs([("description|text/xml", "<run/>"), ("task_id", "1")]).unwrap();
        let req = build_request(Method::Post, "/api", "/run", &params, "key").unwrap();
        let ct = req
            .headers
            .iter()
            .find(|(k, _)| k == "Content-Type")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert!(ct.starts_with("multipart/form-data; boundary="));
        let body = String::from_utf8(req.body.clone().unwrap()).unwrap();
        let desc = body.find("name=\"description\"; filename=\"description\"").unwrap();
        let task = body.find("name=\"task_id\"").unwrap();
        let key = body.find("name=\"api_key\"").unwrap();
        assert!(desc < task && task < key);
    }

    #[test]
    fn file_on_get_is_rejected_before_sending() {
        let params = ParamList::new().file("f", "text/plain", "f", "x");
        let err = build_request(Method::Get, "", "/x", &params, "").err().unwrap();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn path_with_crlf_is_rejected() {
        let err = build_request(Method::Get, "", "/x HTTP/1.1\r\nX: y", &ParamList::new(), "")
            .err()
            .unwrap();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn non_success_status_becomes_number() {
        let mut r = Response::new(412);
        r.body = b"{\"error\":{\"code\":\"372\"}}".to_vec();
        assert_eq!(json_result(&r).unwrap(), Value::from(412));
    }

    #[test]
    fn success_body_is_parsed_in_key_order() {
        let mut r = Response::new(200);
        r.body = br#"{"z":1,"a":[true,null,"s"]}"#.to_vec();
        let v = json_result(&r).unwrap();
        let keys: Vec<&String> = v.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["z", "a"]);

        r.body.clear();
        assert_eq!(json_result(&r).unwrap(), Value::Null);

        r.body = b"<html>".to_vec();
        assert!(matches!(json_result(&r), Err(ConnectionError::Parse(_))));
    }
}
