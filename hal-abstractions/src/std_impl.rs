//! Host implementations backed by the standard library
//!
//! Lets the pipeline run unmodified on a development machine against a
//! gateway simulator. Wi-Fi and the sensor have no host equivalent; use the
//! `mock` implementations for those.

use std::io::{self, Read as _, Write as _};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_io::{ErrorKind, ErrorType, Read, Write};

use crate::clock::Clock;
use crate::net::{Connection, Connector};

/// Window after which a blocking read reports `TimedOut` to the caller
const READ_POLL_WINDOW: Duration = Duration::from_millis(50);

/// Milliseconds since the clock was created
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u32 {
        // Truncation gives the same wrapping behaviour as a hardware counter
        self.origin.elapsed().as_millis() as u32
    }
}

/// Thread-sleeping delay provider
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// I/O failure on a host socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdIoError(pub io::ErrorKind);

impl core::fmt::Display for StdIoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "socket error: {}", self.0)
    }
}

impl std::error::Error for StdIoError {}

impl embedded_io::Error for StdIoError {
    fn kind(&self) -> ErrorKind {
        match self.0 {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ErrorKind::TimedOut,
            io::ErrorKind::ConnectionRefused => ErrorKind::ConnectionRefused,
            io::ErrorKind::ConnectionReset => ErrorKind::ConnectionReset,
            io::ErrorKind::BrokenPipe => ErrorKind::BrokenPipe,
            io::ErrorKind::InvalidData => ErrorKind::InvalidData,
            _ => ErrorKind::Other,
        }
    }
}

impl From<io::Error> for StdIoError {
    fn from(e: io::Error) -> Self {
        Self(e.kind())
    }
}

/// Opens `std::net` TCP streams
#[derive(Debug, Default)]
pub struct StdConnector;

impl Connector for StdConnector {
    type Connection<'a>
        = StdConnection
    where
        Self: 'a;
    type Error = StdIoError;

    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout_ms: u32,
    ) -> Result<Self::Connection<'_>, Self::Error> {
        let timeout = Duration::from_millis(u64::from(timeout_ms.max(1)));
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or(StdIoError(io::ErrorKind::NotFound))?;
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(READ_POLL_WINDOW))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        Ok(StdConnection { stream })
    }
}

/// A host TCP stream speaking `embedded-io`
#[derive(Debug)]
pub struct StdConnection {
    stream: TcpStream,
}

impl ErrorType for StdConnection {
    type Error = StdIoError;
}

impl Read for StdConnection {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.stream.read(buf)?)
    }
}

impl Write for StdConnection {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(self.stream.write(buf)?)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(self.stream.flush()?)
    }
}

impl Connection for StdConnection {
    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
