/*
 * loopback.rs
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

//! End-to-end over a real socket: plain TCP to a local server, driven through
//! `Connection::from_config`.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;

use openml_core::{Connection, ConnectionConfig, ConnectionError, ParamList, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Read one request: head lines plus a Content-Length body.
fn read_request(reader: &mut BufReader<TcpStream>) -> Option<(String, Vec<u8>)> {
    let mut head = String::new();
    let mut length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        if let Some((k, v)) = line.split_once(':') {
            if k.eq_ignore_ascii_case("content-length") {
                length = v.trim().parse().ok()?;
            }
        }
        head.push_str(&line);
        if line == "\r\n" {
            break;
        }
    }
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).ok()?;
    Some((head, body))
}

/// Serve each accepted connection with `replies` in turn; report every request seen.
fn serve(replies: Vec<&'static str>, connections: usize) -> (u16, mpsc::Receiver<(String, Vec<u8>)>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut replies = replies.into_iter();
        for _ in 0..connections {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            while let Some(request) = read_request(&mut reader) {
                tx.send(request).unwrap();
                let Some(reply) = replies.next() else { return };
                writer.write_all(reply.as_bytes()).unwrap();
                if reply.contains("Connection: close") {
                    break;
                }
            }
        }
    });
    (port, rx)
}

fn local_config(port: u16) -> ConnectionConfig {
    ConnectionConfig {
        host: "127.0.0.1".into(),
        port,
        use_tls: false,
        read_timeout_secs: 5,
        ..ConnectionConfig::default()
    }
}

#[test]
fn round_trip_over_tcp_with_keep_alive() {
    init_tracing();
    let (port, requests) = serve(
        vec![
            "HTTP/1.1 200 OK\r\nContent-Length: 20\r\n\r\n{\"data\":{\"id\":\"61\"}}",
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\n[1\r\n2\r\n,2\r\n1\r\n]\r\n0\r\n\r\n",
        ],
        1,
    );
    let mut config = local_config(port);
    config.api_key = "secret".into();
    let conn = Connection::from_config(&config).unwrap();

    let value = conn.get("/data/61", &ParamList::new()).unwrap();
    assert_eq!(value["data"]["id"], "61");
    let value = conn
        .post("/data/list", &ParamList::new().field("limit", "2"))
        .unwrap();
    assert_eq!(value, serde_json::json!([1, 2]));

    let (head, body) = requests.recv().unwrap();
    assert!(head.starts_with("GET /api/v1/json/data/61?api_key=secret HTTP/1.1\r\n"), "{}", head);
    assert!(head.contains(&format!("Host: 127.0.0.1:{}\r\n", port)), "{}", head);
    assert!(body.is_empty());
    let (head, body) = requests.recv().unwrap();
    assert!(head.starts_with("POST /api/v1/json/data/list HTTP/1.1\r\n"), "{}", head);
    assert_eq!(body, b"limit=2&api_key=secret");
}

#[test]
fn server_closing_the_connection_is_survived() {
    init_tracing();
    let (port, _requests) = serve(
        vec![
            "HTTP/1.1 404 Not Found\r\nConnection: close\r\nContent-Length: 2\r\n\r\n{}",
            "HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\ntrue",
        ],
        2,
    );
    let conn = Connection::from_config(&local_config(port)).unwrap();
    assert_eq!(conn.get("/x", &ParamList::new()).unwrap(), Value::from(404));
    assert!(!conn.is_connected());
    assert_eq!(conn.get("/x", &ParamList::new()).unwrap(), Value::Bool(true));
}

#[test]
fn nothing_listening_is_a_connect_error() {
    init_tracing();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let conn = Connection::from_config(&local_config(port)).unwrap();
    let err = conn.get("/x", &ParamList::new()).unwrap_err();
    assert!(matches!(err, ConnectionError::Connect { .. }), "{:?}", err);
}
