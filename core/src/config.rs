#![deny(unsafe_code)]
#![deny(warnings)]
//! Configuration structures
//!
//! Everything is supplied at construction time; nothing is persisted.

use core::fmt;

/// Gateway REST endpoint configuration
#[derive(Debug, Clone)]
pub struct RestClientConfig {
    /// Gateway address (all gateways share one fixed IP on their own AP)
    pub host: &'static str,
    /// Gateway HTTP port
    pub port: u16,
    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: u32,
    /// Overall response timeout in milliseconds
    pub timeout_ms: u32,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            host: "192.168.4.1",
            port: 8080,
            connect_timeout_ms: 5000,
            timeout_ms: 5000,
        }
    }
}

/// Gateway discovery and pairing configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Only networks whose SSID starts with this prefix are gateways
    pub ssid_prefix: &'static str,
    /// Shared Wi-Fi passphrase of the gateways
    pub password: &'static str,
    /// This unit's UUID, sent when pairing and with every upload
    pub sensor_unit_id: &'static str,
    /// Candidate list older than this is refreshed before connecting
    pub scan_interval_ms: u32,
    /// Give up on one access point after this long
    pub connect_timeout_ms: u32,
    /// Link status poll period while associating
    pub link_poll_interval_ms: u32,
    /// Oldest radio firmware that does not trigger a warning
    pub latest_firmware: &'static str,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ssid_prefix: "CU-",
            password: "",
            sensor_unit_id: "00000000-0000-0000-0000-000000000000",
            scan_interval_ms: 30_000,
            connect_timeout_ms: 10_000,
            link_poll_interval_ms: 500,
            latest_firmware: "0.6.0",
        }
    }
}

/// Clock synchronization configuration
#[derive(Debug, Clone)]
pub struct TimeSyncConfig {
    /// A base older than this no longer counts as synced
    pub max_sync_age_ms: u32,
}

impl Default for TimeSyncConfig {
    fn default() -> Self {
        Self {
            max_sync_age_ms: 60 * 60 * 1000,
        }
    }
}

/// Scheduler periods and phase offsets
///
/// The millisecond intervals drive the unpaired/unsynced phases off the local
/// clock. The second-based intervals drive the operational phase off Unix
/// time, firing when `unix_now % interval == offset`.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub connect_interval_ms: u32,
    pub sync_time_interval_ms: u32,
    pub reading_interval_secs: u32,
    pub dispatch_interval_secs: u32,
    pub dispatch_offset_secs: u32,
    pub resync_interval_secs: u32,
    pub resync_offset_secs: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            connect_interval_ms: 5000,
            sync_time_interval_ms: 5000,
            reading_interval_secs: 5,
            dispatch_interval_secs: 15,
            dispatch_offset_secs: 1,
            resync_interval_secs: 10 * 60,
            resync_offset_secs: 2,
        }
    }
}

/// Periodic trigger named in a [`ConfigError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    Reading,
    Dispatch,
    Resync,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reading => write!(f, "reading"),
            Self::Dispatch => write!(f, "dispatch"),
            Self::Resync => write!(f, "resync"),
        }
    }
}

/// Rejected scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// An interval is zero
    ZeroInterval(Trigger),
    /// An offset is not smaller than its interval, so it can never match
    OffsetOutOfRange(Trigger),
    /// Two triggers would fire in the same second
    Collision(Trigger, Trigger),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroInterval(t) => write!(f, "{} interval is zero", t),
            Self::OffsetOutOfRange(t) => write!(f, "{} offset is not below its interval", t),
            Self::Collision(a, b) => write!(f, "{} and {} triggers can fire together", a, b),
        }
    }
}

impl core::error::Error for ConfigError {}

impl SchedulerConfig {
    /// Check that the operational-phase triggers are well formed and disjoint
    ///
    /// Two triggers `(a, x)` and `(b, y)` share a second exactly when
    /// `x ≡ y (mod gcd(a, b))`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let triggers = [
            (Trigger::Reading, self.reading_interval_secs, 0),
            (
                Trigger::Dispatch,
                self.dispatch_interval_secs,
                self.dispatch_offset_secs,
            ),
            (
                Trigger::Resync,
                self.resync_interval_secs,
                self.resync_offset_secs,
            ),
        ];

        for (trigger, interval, offset) in triggers {
            if interval == 0 {
                return Err(ConfigError::ZeroInterval(trigger));
            }
            if offset >= interval {
                return Err(ConfigError::OffsetOutOfRange(trigger));
            }
        }

        for i in 0..triggers.len() {
            for j in (i + 1)..triggers.len() {
                let (ta, a, x) = triggers[i];
                let (tb, b, y) = triggers[j];
                let g = gcd(a, b);
                if x % g == y % g {
                    return Err(ConfigError::Collision(ta, tb));
                }
            }
        }
        Ok(())
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
