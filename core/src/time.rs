#![deny(unsafe_code)]
#![deny(warnings)]
//! Wall-clock time without an RTC
//!
//! One `GET /time` round trip yields a Unix timestamp. It is stored together
//! with the local millisecond counter at that moment (the *base*), and the
//! current time is extrapolated from the counter until the next sync:
//!
//! ```text
//! now = base_unix + (now_ms - base_millis) / 1000
//! ```
//!
//! There is no drift correction. A base that has not been refreshed for
//! `max_sync_age_ms` stops counting as synced, so a unit whose syncs keep
//! failing eventually stops stamping readings instead of drifting forever.

use sensorunit_hal::Clock;

use crate::config::TimeSyncConfig;
use crate::network::json::parse_time_response;
use crate::network::{RestApi, TIME_PATH};

/// Source of Unix time for the scheduler and the sampler
pub trait TimeSource {
    /// Whether [`TimeSource::unix_time_now`] can be trusted
    fn is_time_synced(&self) -> bool;

    /// Current Unix time in seconds, 0 when not synced
    fn unix_time_now(&self) -> u32;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn is_time_synced(&self) -> bool {
        (**self).is_time_synced()
    }

    fn unix_time_now(&self) -> u32 {
        (**self).unix_time_now()
    }
}

/// Last network-confirmed time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeBase {
    pub base_unix: u32,
    pub base_millis: u32,
    pub synced: bool,
}

pub struct TimeSyncManager<K> {
    clock: K,
    config: TimeSyncConfig,
    base: TimeBase,
}

impl<K: Clock> TimeSyncManager<K> {
    pub fn new(clock: K, config: TimeSyncConfig) -> Self {
        Self {
            clock,
            config,
            base: TimeBase::default(),
        }
    }

    /// Fetch the gateway's time and rebase on success
    ///
    /// On failure the current base is kept unless it has outlived
    /// `max_sync_age_ms`, in which case it is invalidated.
    pub fn sync_time<R: RestApi>(&mut self, rest: &mut R) -> bool {
        info!("Syncing time");
        let response = rest.get_to(TIME_PATH);

        if response.is_ok() {
            match parse_time_response(response.body()) {
                Ok(unix) if unix != 0 => {
                    self.base = TimeBase {
                        base_unix: unix,
                        base_millis: self.clock.now_ms(),
                        synced: true,
                    };
                    info!("Time synced, Unix time {}", unix);
                    return true;
                }
                Ok(_) => warn!("Gateway reported Unix time 0"),
                Err(e) => warn!("Bad /time reply: {}", e),
            }
        } else {
            warn!("Time sync failed with status {}", response.status);
        }

        if self.base.synced && self.base_age_ms() > self.config.max_sync_age_ms {
            self.base.synced = false;
            warn!("Time sync expired after repeated failures");
        }
        false
    }

    pub fn base(&self) -> TimeBase {
        self.base
    }

    fn base_age_ms(&self) -> u32 {
        self.clock.elapsed_since(self.base.base_millis)
    }
}

impl<K: Clock> TimeSource for TimeSyncManager<K> {
    fn is_time_synced(&self) -> bool {
        self.base.synced && self.base_age_ms() <= self.config.max_sync_age_ms
    }

    fn unix_time_now(&self) -> u32 {
        if !self.is_time_synced() {
            warn!("Time is not synced");
            return 0;
        }
        self.base
            .base_unix
            .wrapping_add(self.base_age_ms() / 1000)
    }
}
