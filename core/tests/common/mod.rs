/*
 * common/mod.rs
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

//! In-memory transport that answers each complete request with a scripted reply.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use openml_core::Transport;

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl SeenRequest {
    /// `METHOD target` from the request line.
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or("")
    }

    pub fn target(&self) -> &str {
        self.request_line().split(' ').nth(1).unwrap_or("")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Bytes to hand back for one request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub bytes: Vec<u8>,
    /// Largest slice returned by a single `read`.
    pub chunk: usize,
    /// End the stream once `bytes` are consumed.
    pub close_after: bool,
}

impl Reply {
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            chunk: usize::MAX,
            close_after: false,
        }
    }

    /// `200 OK` with a JSON body and Content-Length.
    pub fn json(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn status(code: u16, body: &str) -> Self {
        Self::raw(format!(
            "HTTP/1.1 {} Whatever\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            code,
            body.len(),
            body
        ))
    }

    pub fn in_chunks_of(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }

    pub fn then_close(mut self) -> Self {
        self.close_after = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(String, u16),
    Write(usize),
    Close,
}

type Responder = Box<dyn FnMut(&SeenRequest) -> Reply + Send>;

/// State visible to the test after the transport has been moved into a connection.
#[derive(Default)]
pub struct Shared {
    pub events: Vec<Event>,
    pub requests: Vec<SeenRequest>,
    /// Number of upcoming `connect` calls that fail.
    pub refuse_connects: usize,
}

impl Shared {
    pub fn connects(&self) -> Vec<(String, u16)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Connect(h, p) => Some((h.clone(), *p)),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> usize {
        self.events.iter().filter(|e| **e == Event::Close).count()
    }
}

pub struct ScriptedTransport {
    shared: Arc<Mutex<Shared>>,
    responder: Responder,
    connected: bool,
    pending: Vec<u8>,
    reply: Option<(Reply, usize)>,
}

impl ScriptedTransport {
    /// Transport that calls `responder` for every complete request.
    pub fn new(responder: impl FnMut(&SeenRequest) -> Reply + Send + 'static) -> (Self, Arc<Mutex<Shared>>) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let transport = Self {
            shared: Arc::clone(&shared),
            responder: Box::new(responder),
            connected: false,
            pending: Vec::new(),
            reply: None,
        };
        (transport, shared)
    }

    /// Transport that answers requests with `replies` in order.
    pub fn scripted(replies: impl IntoIterator<Item = Reply>) -> (Self, Arc<Mutex<Shared>>) {
        let mut queue: VecDeque<Reply> = replies.into_iter().collect();
        Self::new(move |_| queue.pop_front().unwrap_or_else(|| Reply::raw(Vec::new()).then_close()))
    }

    /// Turn buffered writes into a request once head and Content-Length body are all here.
    fn take_request(&mut self) -> Option<SeenRequest> {
        let end = self.pending.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
        let head = String::from_utf8_lossy(&self.pending[..end]).into_owned();
        let length = head
            .lines()
            .find_map(|l| {
                let (k, v) = l.split_once(':')?;
                k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        if self.pending.len() < end + length {
            return None;
        }
        let body = self.pending[end..end + length].to_vec();
        self.pending.drain(..end + length);
        Some(SeenRequest { head, body })
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        let mut shared = self.shared.lock().unwrap();
        if shared.refuse_connects > 0 {
            shared.refuse_connects -= 1;
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        }
        shared.events.push(Event::Connect(host.to_string(), port));
        self.connected = true;
        self.pending.clear();
        self.reply = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.connected {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "not connected"));
        }
        self.shared.lock().unwrap().events.push(Event::Write(data.len()));
        self.pending.extend_from_slice(data);
        if let Some(request) = self.take_request() {
            let reply = (self.responder)(&request);
            self.shared.lock().unwrap().requests.push(request);
            self.reply = Some((reply, 0));
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.connected {
            return Ok(0);
        }
        let Some((reply, pos)) = self.reply.as_mut() else {
            self.connected = false;
            return Ok(0);
        };
        let remaining = reply.bytes.len() - *pos;
        if remaining == 0 {
            if reply.close_after {
                self.connected = false;
            }
            self.reply = None;
            if !self.connected {
                return Ok(0);
            }
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no more scripted bytes"));
        }
        let n = remaining.min(reply.chunk).min(buf.len());
        buf[..n].copy_from_slice(&reply.bytes[*pos..*pos + n]);
        *pos += n;
        Ok(n)
    }

    fn close(&mut self) {
        if self.connected {
            self.shared.lock().unwrap().events.push(Event::Close);
        }
        self.connected = false;
        self.pending.clear();
        self.reply = None;
    }
}
