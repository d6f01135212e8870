//! TCP transport capability
//!
//! The HTTP client opens exactly one connection per request through a
//! [`Connector`] and talks to it with the blocking `embedded-io` traits.
//!
//! ## Read semantics
//!
//! - `Ok(0)` from [`embedded_io::Read::read`] means the peer closed the stream
//! - an error whose [`embedded_io::Error::kind`] is
//!   [`embedded_io::ErrorKind::TimedOut`] means no data arrived within the
//!   transport's poll window; the caller decides whether to keep waiting
//! - any other error is fatal for the exchange

use embedded_io::{Read, Write};

/// An open, byte-oriented stream to a remote host
pub trait Connection: Read + Write {
    /// Shut the stream down; further reads and writes fail
    fn close(&mut self);
}

/// Factory for outbound TCP connections
pub trait Connector {
    /// Connection type, possibly borrowing socket buffers from the connector
    type Connection<'a>: Connection
    where
        Self: 'a;

    /// Connect failure
    type Error: core::fmt::Debug;

    /// Open a connection to `host:port`, giving up after `timeout_ms`
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout_ms: u32,
    ) -> Result<Self::Connection<'_>, Self::Error>;
}
