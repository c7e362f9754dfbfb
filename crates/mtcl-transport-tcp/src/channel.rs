//! A single established TCP connection, exposing `mtcl_core::transport::Channel`.
//!
//! # Why
//! Framing (the 8-byte length header) and the probed-frame cache both live in
//! `mtcl-core` (`frame`, `handle`); this channel only has to turn a socket
//! into the raw send/probe/receive/shutdown primitives the core expects.
//!
//! # How
//! Non-blocking probes toggle `TcpStream::set_nonblocking` around a single
//! read, rather than keeping the stream permanently non-blocking — `receive`
//! and blocking `probe` calls still want ordinary blocking reads. This is not
//! race-free against a concurrent blocking call on the same channel from
//! another thread, but `mtcl-core::handle::HandleCore` only ever has one
//! owner (app xor runtime) issuing I/O at a time, so the flag never flips
//! under a conflicting in-flight call.
use std::io::{self, Read, Write};
use std::net::{Shutdown as StdShutdown, TcpStream};
use std::sync::Mutex;

use mtcl_core::error::{ErrorKind, MtclError, Result};
use mtcl_core::frame;
use mtcl_core::transport::{Channel, ShutdownDirection};

pub struct TcpChannel {
    id: u64,
    stream: Mutex<TcpStream>,
    peer_addr: Option<String>,
    /// Persists a length header read across `WouldBlock`: a non-blocking
    /// `probe_raw` that only sees part of the 8-byte header must not discard
    /// the bytes it already consumed, or every later frame on this
    /// connection desyncs.
    header_reader: Mutex<frame::HeaderReader>,
}

impl TcpChannel {
    pub(crate) fn new(id: u64, stream: TcpStream, peer_addr: Option<String>) -> Self {
        let _ = stream.set_nodelay(true);
        Self {
            id,
            stream: Mutex::new(stream),
            peer_addr,
            header_reader: Mutex::new(frame::HeaderReader::new()),
        }
    }

    fn with_nonblocking<T>(&self, f: impl FnOnce(&mut TcpStream) -> io::Result<T>) -> io::Result<T> {
        let mut stream = self.stream.lock().unwrap();
        stream.set_nonblocking(true)?;
        let result = f(&mut stream);
        stream.set_nonblocking(false)?;
        result
    }

    /// Non-destructively checks whether at least one byte (or EOF) is
    /// currently pending, without consuming the frame header. Used by
    /// `TcpDriver::update` to decide whether a re-armed channel is ready to
    /// dispatch, without racing the header-consuming `probe_raw`.
    pub(crate) fn has_pending_bytes(&self) -> io::Result<bool> {
        let mut probe = [0u8; 1];
        match self.with_nonblocking(|stream| stream.peek(&mut probe)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn is_peer_reset(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted)
}

fn map_io_error(e: io::Error) -> MtclError {
    let kind = match e.kind() {
        io::ErrorKind::TimedOut => ErrorKind::Timeout,
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => ErrorKind::PeerReset,
        _ => ErrorKind::Io,
    };
    MtclError::new(kind, e.to_string()).with_source(e)
}

impl Channel for TcpChannel {
    fn id(&self) -> u64 {
        self.id
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }

    fn send(&self, payload: &[u8]) -> Result<()> {
        let mut stream = self.stream.lock().unwrap();
        frame::write_frame(&mut *stream, payload).map_err(map_io_error)
    }

    fn probe_raw(&self, blocking: bool) -> Result<u64> {
        let mut reader = self.header_reader.lock().unwrap();
        if blocking {
            let mut stream = self.stream.lock().unwrap();
            return match reader.read(&mut *stream) {
                Ok(Some(size)) => Ok(size),
                Ok(None) => Ok(0),
                Err(e) if is_peer_reset(&e) => Ok(0),
                Err(e) => Err(map_io_error(e)),
            };
        }
        match self.with_nonblocking(|stream| reader.read(stream)) {
            Ok(Some(size)) => Ok(size),
            Ok(None) => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(MtclError::would_block("no frame ready")),
            Err(e) if is_peer_reset(&e) => Ok(0),
            Err(e) => Err(map_io_error(e)),
        }
    }

    fn receive_raw(&self, buf: &mut [u8]) -> Result<usize> {
        let mut stream = self.stream.lock().unwrap();
        match stream.read_exact(buf) {
            Ok(()) => Ok(buf.len()),
            Err(e) if is_peer_reset(&e) => Ok(0),
            Err(e) => Err(map_io_error(e)),
        }
    }

    fn shutdown(&self, direction: ShutdownDirection) -> Result<()> {
        let mut stream = self.stream.lock().unwrap();
        if matches!(direction, ShutdownDirection::Write | ShutdownDirection::Both) {
            // Emit the zero-length EOS frame before tearing down the write
            // half, per mtcl-core's framing contract.
            let _ = frame::write_frame(&mut *stream, &[]);
            let _ = stream.shutdown(StdShutdown::Write);
        }
        if matches!(direction, ShutdownDirection::Read | ShutdownDirection::Both) {
            let _ = stream.shutdown(StdShutdown::Read);
        }
        Ok(())
    }
}
