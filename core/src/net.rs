/*
 * net.rs
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

//! Blocking TLS transport: std `TcpStream` wrapped with a rustls client session.
//!
//! The stream can be plain (local servers, tests) or secure; the secure path
//! completes the handshake inside `connect` so handshake failures surface as
//! connect errors rather than on the first request write.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use rustls::client::ClientConfig;
use rustls::pki_types::ServerName;
use rustls::{ClientConnection, RootCertStore, StreamOwned};
use tracing::{debug, trace};

use crate::transport::Transport;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            for cert in certs {
                let _ = root_store.add(cert);
            }
        }
        Err(e) => debug!(error = %e, "native root certificates unavailable"),
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

/// Process-wide TLS client config (native + Mozilla roots, no client auth, ALPN http/1.1).
pub fn client_config() -> Arc<ClientConfig> {
    static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();
    CONFIG
        .get_or_init(|| {
            let mut config = ClientConfig::builder()
                .with_root_certificates(build_root_store())
                .with_no_client_auth();
            config.alpn_protocols = vec![b"http/1.1".to_vec()];
            Arc::new(config)
        })
        .clone()
}

/// Plain TCP or TLS over TCP.
pub enum HttpStream {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl HttpStream {
    fn shutdown(self) {
        match self {
            HttpStream::Plain(s) => {
                let _ = s.shutdown(Shutdown::Both);
            }
            HttpStream::Tls(mut s) => {
                s.conn.send_close_notify();
                let _ = s.conn.write_tls(&mut s.sock);
                let _ = s.sock.shutdown(Shutdown::Both);
            }
        }
    }
}

impl Read for HttpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            HttpStream::Plain(s) => s.read(buf),
            HttpStream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for HttpStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            HttpStream::Plain(s) => s.write(buf),
            HttpStream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            HttpStream::Plain(s) => s.flush(),
            HttpStream::Tls(s) => s.flush(),
        }
    }
}

/// TCP connect trying each resolved address in turn, each bounded by `timeout`.
fn connect_tcp(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(tcp) => return Ok(tcp),
            Err(e) => {
                debug!(%addr, error = %e, "TCP connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
    }))
}

/// Run the TLS handshake to completion over `tcp`.
fn tls_handshake(
    host: &str,
    mut tcp: TcpStream,
) -> io::Result<StreamOwned<ClientConnection, TcpStream>> {
    let server_name = ServerName::try_from(host)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?
        .to_owned();
    let mut conn = ClientConnection::new(client_config(), server_name)
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
    while conn.is_handshaking() {
        conn.complete_io(&mut tcp)?;
    }
    Ok(StreamOwned::new(conn, tcp))
}

/// The production transport. One stream at a time; `connect` replaces it.
pub struct SecureTransport {
    use_tls: bool,
    connect_timeout: Duration,
    read_timeout: Duration,
    stream: Option<HttpStream>,
}

impl SecureTransport {
    /// TLS transport with default timeouts.
    pub fn new() -> Self {
        Self::with_options(true, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }

    /// Plaintext transport, for local servers.
    pub fn plain() -> Self {
        Self::with_options(false, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }

    /// `read_timeout` also bounds each write.
    pub fn with_options(use_tls: bool, connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            use_tls,
            connect_timeout,
            read_timeout,
            stream: None,
        }
    }

    pub fn is_secure(&self) -> bool {
        self.use_tls
    }

    fn stream_mut(&mut self) -> io::Result<&mut HttpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "transport not connected"))
    }
}

impl Default for SecureTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SecureTransport {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        self.close();
        let tcp = connect_tcp(host, port, self.connect_timeout)?;
        tcp.set_read_timeout(Some(self.read_timeout))?;
        tcp.set_write_timeout(Some(self.read_timeout))?;
        tcp.set_nodelay(true)?;
        let stream = if self.use_tls {
            HttpStream::Tls(Box::new(tls_handshake(host, tcp)?))
        } else {
            HttpStream::Plain(tcp)
        };
        debug!(host, port, tls = self.use_tls, "transport connected");
        self.stream = Some(stream);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let stream = self.stream_mut()?;
        stream.write_all(data)?;
        stream.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let result = self.stream_mut()?.read(buf);
        let n = match result {
            // Peers commonly drop TCP without close_notify; that is end of stream here.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => 0,
            other => other?,
        };
        trace!(bytes = n, "transport read");
        if n == 0 {
            self.stream = None;
        }
        Ok(n)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("transport closed");
            stream.shutdown();
        }
    }
}

impl Drop for SecureTransport {
    fn drop(&mut self) {
        self.close();
    }
}
