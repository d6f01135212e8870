//! Wi-Fi radio capability
//!
//! Mirrors the shape of small vendor Wi-Fi drivers: a blocking scan whose
//! results are then read back by index, and a non-blocking association that
//! the caller polls through [`WifiRadio::link_status`].

use heapless::String;

/// Maximum SSID length in bytes (IEEE 802.11)
pub const SSID_MAX_LEN: usize = 32;

/// Association state reported by the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// No radio module answered on the bus
    NoModule,
    /// Radio present, not associated
    Idle,
    /// Association in progress
    Connecting,
    /// Associated with an access point and holding an address
    Connected,
    /// The last association attempt failed
    Failed,
    /// Link was lost after being connected
    Disconnected,
}

/// One network seen by the last scan
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccessPoint {
    /// Network name
    pub ssid: String<SSID_MAX_LEN>,
    /// Received signal strength in dBm (closer to zero is stronger)
    pub rssi: i32,
}

/// Wi-Fi station interface
pub trait WifiRadio {
    /// Driver-specific failure
    type Error: core::fmt::Debug;

    /// Current association state
    fn link_status(&mut self) -> LinkStatus;

    /// Radio firmware version as `major.minor.patch`
    fn firmware_version(&mut self) -> &str;

    /// Run a blocking scan and return the number of networks found
    fn scan(&mut self) -> Result<usize, Self::Error>;

    /// Result `index` of the last scan, `None` past the end
    fn scanned(&self, index: usize) -> Option<AccessPoint>;

    /// Start associating with `ssid`; completion is observed via `link_status`
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), Self::Error>;

    /// Drop any association, returning the radio to idle
    fn disconnect(&mut self);
}
