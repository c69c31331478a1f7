// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Accepted connection handle.
//!
//! A `ConnectionHandle` is the only owner of an accepted connection. It is
//! moved, never cloned, from the acceptor to the handoff dispatcher.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Exclusive ownership of one accepted connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    fd: OwnedFd,
    peer: String,
}

impl ConnectionHandle {
    /// Wrap an owned descriptor as-is.
    pub fn new(fd: OwnedFd, peer: impl Into<String>) -> Self {
        Self {
            fd,
            peer: peer.into(),
        }
    }

    /// Take over the connection behind `source` in a form that survives
    /// image replacement.
    ///
    /// The descriptor is duplicated with `dup(2)`, which leaves the copy
    /// without `FD_CLOEXEC`, and the copy is switched to blocking mode.
    /// The caller drops `source` afterwards; the copy is then the only
    /// open descriptor for the connection.
    pub fn inheritable_from(source: &impl AsRawFd, peer: impl Into<String>) -> io::Result<Self> {
        // SAFETY: `source` is a live descriptor for the duration of this call.
        let dup = unsafe { libc::dup(source.as_raw_fd()) };
        if dup < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `dup` was just returned by dup(2) and is owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(dup) };
        set_blocking(&fd)?;

        Ok(Self::new(fd, peer))
    }

    /// The OS-level descriptor number.
    pub fn number(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Transport address of the remote peer.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub(crate) fn into_owned_fd(self) -> OwnedFd {
        self.fd
    }
}

impl AsRawFd for ConnectionHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

fn set_blocking(fd: &OwnedFd) -> io::Result<()> {
    let raw = fd.as_raw_fd();
    // SAFETY: fcntl on a descriptor we own.
    let flags = unsafe { libc::fcntl(raw, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if flags & libc::O_NONBLOCK != 0 {
        let rc = unsafe { libc::fcntl(raw, libc::F_SETFL, flags & !libc::O_NONBLOCK) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Whether `FD_CLOEXEC` is set on a descriptor.
pub fn is_close_on_exec(fd: RawFd) -> io::Result<bool> {
    // SAFETY: F_GETFD only reads descriptor flags.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(flags & libc::FD_CLOEXEC != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_inheritable_copy_clears_cloexec() {
        let (a, _b) = UnixStream::pair().unwrap();
        // std opens sockets with CLOEXEC set
        assert!(is_close_on_exec(a.as_raw_fd()).unwrap());

        let handle = ConnectionHandle::inheritable_from(&a, "AA:BB:CC:DD:EE:FF").unwrap();
        assert_ne!(handle.number(), a.as_raw_fd());
        assert!(!is_close_on_exec(handle.number()).unwrap());
        assert_eq!(handle.peer(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_inheritable_copy_is_blocking() {
        let (a, _b) = UnixStream::pair().unwrap();
        a.set_nonblocking(true).unwrap();

        let handle = ConnectionHandle::inheritable_from(&a, "peer").unwrap();
        let flags = unsafe { libc::fcntl(handle.number(), libc::F_GETFL) };
        assert_eq!(flags & libc::O_NONBLOCK, 0);
    }

    #[test]
    fn test_copy_outlives_source() {
        let (a, mut b) = UnixStream::pair().unwrap();
        let handle = ConnectionHandle::inheritable_from(&a, "peer").unwrap();
        drop(a);

        let mut stream = UnixStream::from(handle.into_owned_fd());
        stream.write_all(b"ping").unwrap();

        let mut buf = [0u8; 4];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
    }
}
