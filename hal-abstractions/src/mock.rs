//! Scriptable test doubles for every capability trait
//!
//! All doubles are `no_std` and heap-free so they can also drive on-target
//! self tests. Time only moves when a test (or a delay) moves it, which keeps
//! timeout paths deterministic.

use core::cell::Cell;

use embedded_hal::delay::DelayNs;
use embedded_io::{ErrorKind, ErrorType, Read, Write};
use heapless::{Deque, String, Vec};

use crate::clock::Clock;
use crate::net::{Connection, Connector};
use crate::radio::{AccessPoint, LinkStatus, WifiRadio, SSID_MAX_LEN};
use crate::sensor::{RawReading, SensorReader};

/// Hand-driven clock
///
/// With a non-zero `auto_step_ms`, every `now_ms()` call advances time after
/// reporting it, so busy-wait loops with deadlines always terminate.
#[derive(Debug, Default)]
pub struct MockClock {
    now: Cell<u32>,
    auto_step_ms: Cell<u32>,
}

impl MockClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Cell::new(start_ms),
            auto_step_ms: Cell::new(0),
        }
    }

    pub fn with_auto_step(start_ms: u32, step_ms: u32) -> Self {
        Self {
            now: Cell::new(start_ms),
            auto_step_ms: Cell::new(step_ms),
        }
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn set_auto_step(&self, step_ms: u32) {
        self.auto_step_ms.set(step_ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.auto_step_ms.get()));
        now
    }
}

/// Delays advance the shared clock instead of sleeping
impl DelayNs for &MockClock {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(ns / 1_000_000);
    }

    fn delay_us(&mut self, us: u32) {
        self.advance(us / 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms);
    }
}

/// Sensor failure injected by [`MockSensorReader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSensorError;

/// Sensor returning a fixed sample
#[derive(Debug, Clone)]
pub struct MockSensorReader {
    pub reading: RawReading,
    pub fail: bool,
    pub reads: u32,
}

impl MockSensorReader {
    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            reading: RawReading {
                temperature,
                humidity,
            },
            fail: false,
            reads: 0,
        }
    }
}

impl Default for MockSensorReader {
    fn default() -> Self {
        Self::new(22.5, 45.0)
    }
}

impl SensorReader for MockSensorReader {
    type Error = MockSensorError;

    fn read(&mut self) -> Result<RawReading, Self::Error> {
        self.reads += 1;
        if self.fail {
            Err(MockSensorError)
        } else {
            Ok(self.reading)
        }
    }
}

/// Radio failure injected by [`MockRadio`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockRadioError {
    ScanFailed,
    NoModule,
}

/// Radio with a scripted set of visible and reachable networks
#[derive(Debug)]
pub struct MockRadio {
    pub present: bool,
    pub firmware: &'static str,
    pub visible: Vec<AccessPoint, 16>,
    pub reachable: Vec<String<SSID_MAX_LEN>, 8>,
    pub attempts: Vec<String<SSID_MAX_LEN>, 16>,
    pub scans: u32,
    pub disconnects: u32,
    pub fail_scan: bool,
    status: LinkStatus,
}

impl MockRadio {
    pub fn new() -> Self {
        Self {
            present: true,
            firmware: "0.6.0",
            visible: Vec::new(),
            reachable: Vec::new(),
            attempts: Vec::new(),
            scans: 0,
            disconnects: 0,
            fail_scan: false,
            status: LinkStatus::Idle,
        }
    }

    /// Make `ssid` visible to scans with the given signal strength
    pub fn add_network(&mut self, ssid: &str, rssi: i32, reachable: bool) {
        let ssid: String<SSID_MAX_LEN> = truncated(ssid);
        if reachable {
            let _ = self.reachable.push(ssid.clone());
        }
        let _ = self.visible.push(AccessPoint { ssid, rssi });
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiRadio for MockRadio {
    type Error = MockRadioError;

    fn link_status(&mut self) -> LinkStatus {
        if self.present {
            self.status
        } else {
            LinkStatus::NoModule
        }
    }

    fn firmware_version(&mut self) -> &str {
        self.firmware
    }

    fn scan(&mut self) -> Result<usize, Self::Error> {
        if !self.present {
            return Err(MockRadioError::NoModule);
        }
        self.scans += 1;
        if self.fail_scan {
            return Err(MockRadioError::ScanFailed);
        }
        Ok(self.visible.len())
    }

    fn scanned(&self, index: usize) -> Option<AccessPoint> {
        self.visible.get(index).cloned()
    }

    fn begin(&mut self, ssid: &str, _password: &str) -> Result<(), Self::Error> {
        if !self.present {
            return Err(MockRadioError::NoModule);
        }
        let ssid: String<SSID_MAX_LEN> = truncated(ssid);
        let _ = self.attempts.push(ssid.clone());
        self.status = if self.reachable.contains(&ssid) {
            LinkStatus::Connected
        } else {
            LinkStatus::Connecting
        };
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
        if self.present {
            self.status = LinkStatus::Idle;
        }
    }
}

fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Largest scripted response
pub const MOCK_REPLY_CAPACITY: usize = 1024;
/// Largest captured request
pub const MOCK_REQUEST_CAPACITY: usize = 2048;
/// Bytes handed out per `read` call, to exercise partial reads
const MOCK_READ_CHUNK: usize = 7;

/// What the next connection attempt does
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Connection refused
    Refuse,
    /// Send `bytes`, then close, or go silent when `keep_open`
    Respond {
        bytes: Vec<u8, MOCK_REPLY_CAPACITY>,
        keep_open: bool,
    },
    /// Accept the connection and never send anything
    Stall,
    /// Accept the connection, then fail every write
    FailWrite,
    /// Accept the request, then reset the connection on the first read
    FailRead,
}

impl MockReply {
    pub fn respond(bytes: &[u8]) -> Self {
        Self::Respond {
            bytes: reply_bytes(bytes),
            keep_open: false,
        }
    }

    pub fn respond_keep_open(bytes: &[u8]) -> Self {
        Self::Respond {
            bytes: reply_bytes(bytes),
            keep_open: true,
        }
    }

    /// Convenience for a complete HTTP response carrying a JSON body
    pub fn http(status_line: &str, body: &str) -> Self {
        let mut bytes: Vec<u8, MOCK_REPLY_CAPACITY> = Vec::new();
        for part in [
            status_line.as_bytes(),
            b"\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n",
            body.as_bytes(),
        ] {
            bytes
                .extend_from_slice(part)
                .expect("mock reply exceeds MOCK_REPLY_CAPACITY");
        }
        Self::Respond {
            bytes,
            keep_open: false,
        }
    }
}

fn reply_bytes(bytes: &[u8]) -> Vec<u8, MOCK_REPLY_CAPACITY> {
    Vec::from_slice(bytes).expect("mock reply exceeds MOCK_REPLY_CAPACITY")
}

/// Transport failure raised by [`MockConnection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockIoError {
    TimedOut,
    Closed,
    Refused,
    Reset,
}

impl core::fmt::Display for MockIoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TimedOut => write!(f, "timed out"),
            Self::Closed => write!(f, "connection closed"),
            Self::Refused => write!(f, "connection refused"),
            Self::Reset => write!(f, "connection reset"),
        }
    }
}

impl core::error::Error for MockIoError {}

impl embedded_io::Error for MockIoError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::TimedOut => ErrorKind::TimedOut,
            Self::Closed => ErrorKind::BrokenPipe,
            Self::Refused => ErrorKind::ConnectionRefused,
            Self::Reset => ErrorKind::ConnectionReset,
        }
    }
}

/// Connector replaying one scripted reply per connection
#[derive(Debug, Default)]
pub struct MockConnector {
    replies: Deque<MockReply, 8>,
    last_request: Vec<u8, MOCK_REQUEST_CAPACITY>,
    pub connects: u32,
    pub closes: u32,
    pub last_host: String<64>,
    pub last_port: u16,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the behaviour of the next connection; unscripted connects are refused
    pub fn push_reply(&mut self, reply: MockReply) {
        self.replies
            .push_back(reply)
            .expect("too many scripted replies");
    }

    /// Everything written on the most recent connection
    pub fn last_request(&self) -> &str {
        core::str::from_utf8(&self.last_request).unwrap_or("")
    }
}

impl Connector for MockConnector {
    type Connection<'a>
        = MockConnection<'a>
    where
        Self: 'a;
    type Error = MockIoError;

    fn connect(
        &mut self,
        host: &str,
        port: u16,
        _timeout_ms: u32,
    ) -> Result<Self::Connection<'_>, Self::Error> {
        self.connects += 1;
        self.last_host = truncated(host);
        self.last_port = port;
        self.last_request.clear();
        match self.replies.pop_front() {
            None | Some(MockReply::Refuse) => Err(MockIoError::Refused),
            Some(reply) => Ok(MockConnection {
                connector: self,
                reply,
                position: 0,
                closed: false,
            }),
        }
    }
}

/// One scripted connection
#[derive(Debug)]
pub struct MockConnection<'a> {
    connector: &'a mut MockConnector,
    reply: MockReply,
    position: usize,
    closed: bool,
}

impl ErrorType for MockConnection<'_> {
    type Error = MockIoError;
}

impl Read for MockConnection<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.closed {
            return Err(MockIoError::Closed);
        }
        match &self.reply {
            MockReply::Respond { bytes, keep_open } => {
                let remaining = &bytes[self.position..];
                if remaining.is_empty() {
                    return if *keep_open {
                        Err(MockIoError::TimedOut)
                    } else {
                        Ok(0)
                    };
                }
                let n = remaining.len().min(buf.len()).min(MOCK_READ_CHUNK);
                buf[..n].copy_from_slice(&remaining[..n]);
                self.position += n;
                Ok(n)
            }
            MockReply::FailRead => Err(MockIoError::Reset),
            MockReply::Refuse | MockReply::Stall | MockReply::FailWrite => {
                Err(MockIoError::TimedOut)
            }
        }
    }
}

impl Write for MockConnection<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.closed || matches!(self.reply, MockReply::FailWrite) {
            return Err(MockIoError::Closed);
        }
        let room = MOCK_REQUEST_CAPACITY - self.connector.last_request.len();
        let n = buf.len().min(room);
        let _ = self.connector.last_request.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Connection for MockConnection<'_> {
    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.connector.closes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_step_advances_after_read() {
        let clock = MockClock::with_auto_step(100, 10);
        assert_eq!(clock.now_ms(), 100);
        assert_eq!(clock.now_ms(), 110);
    }

    #[test]
    fn test_delay_moves_clock() {
        let clock = MockClock::new(0);
        let mut delay = &clock;
        delay.delay_ms(500);
        assert_eq!(clock.now_ms(), 500);
    }

    #[test]
    fn test_radio_connects_only_to_reachable() {
        let mut radio = MockRadio::new();
        radio.add_network("CU-1", -50, false);
        radio.add_network("CU-2", -60, true);
        radio.begin("CU-1", "pw").unwrap();
        assert_eq!(radio.link_status(), LinkStatus::Connecting);
        radio.begin("CU-2", "pw").unwrap();
        assert_eq!(radio.link_status(), LinkStatus::Connected);
        assert_eq!(radio.attempts.len(), 2);
    }

    #[test]
    fn test_connector_replays_in_order() {
        let mut connector = MockConnector::new();
        connector.push_reply(MockReply::respond(b"abc"));
        {
            let mut conn = connector.connect("host", 80, 100).unwrap();
            conn.write(b"GET").unwrap();
            let mut buf = [0u8; 8];
            assert_eq!(conn.read(&mut buf).unwrap(), 3);
            assert_eq!(conn.read(&mut buf).unwrap(), 0);
            conn.close();
        }
        assert_eq!(connector.last_request(), "GET");
        assert_eq!(connector.closes, 1);
        assert!(connector.connect("host", 80, 100).is_err());
    }

    #[test]
    fn test_failure_replies_raise_transport_errors() {
        let mut connector = MockConnector::new();
        connector.push_reply(MockReply::FailWrite);
        connector.push_reply(MockReply::FailRead);
        {
            let mut conn = connector.connect("host", 80, 100).unwrap();
            assert_eq!(conn.write(b"GET"), Err(MockIoError::Closed));
        }
        assert_eq!(connector.last_request(), "");

        let mut conn = connector.connect("host", 80, 100).unwrap();
        assert_eq!(conn.write(b"GET").unwrap(), 3);
        let mut buf = [0u8; 8];
        let err = conn.read(&mut buf).unwrap_err();
        assert_eq!(embedded_io::Error::kind(&err), ErrorKind::ConnectionReset);
    }
}
