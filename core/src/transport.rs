/*
 * transport.rs
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

//! Byte-stream transport consumed by the HTTP layer.
//!
//! `SecureTransport` (in `net`) is the real implementation. Tests substitute
//! scripted transports to control exactly how bytes arrive.

use std::io;

/// Blocking byte stream to one host:port at a time.
pub trait Transport: Send {
    /// Open a stream to `host:port`, replacing any stream already open.
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()>;

    /// True while a stream is open and has not been closed by either side.
    fn is_connected(&self) -> bool;

    /// Write all of `data` and flush.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read whatever is available into `buf`. `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Close the stream. No-op when already closed.
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        (**self).connect(host, port)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
