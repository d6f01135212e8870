#![deny(unsafe_code)]
#![deny(warnings)]
//! Tick-driven scheduler
//!
//! No timers, no callbacks: the outer loop calls [`Schedule::tick`] as often
//! as it likes and acts on the returned flags. Exactly one phase is
//! evaluated per tick:
//!
//! | Paired | Synced | Clock | Triggers |
//! |---|---|---|---|
//! | no | - | local ms | `connect` every `connect_interval_ms` |
//! | yes | no | local ms | `resync` every `sync_time_interval_ms` |
//! | yes | yes | Unix s | `reading`, `dispatch`, `resync` on `now % interval == offset` |
//!
//! Matching on Unix time keeps the periodic triggers phase-locked to the wall
//! clock, with no drift from late ticks. Distinct offsets keep them apart,
//! which [`SchedulerConfig::validate`] checks up front.

use sensorunit_hal::Clock;

use crate::config::{ConfigError, SchedulerConfig};
use crate::time::TimeSource;

/// Work due this tick; all false by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchedulerResult {
    pub connect_trigger: bool,
    pub reading_trigger: bool,
    pub dispatch_trigger: bool,
    pub resync_trigger: bool,
}

impl SchedulerResult {
    pub fn any(&self) -> bool {
        self.connect_trigger || self.reading_trigger || self.dispatch_trigger || self.resync_trigger
    }
}

/// Decides which phase of work is due
pub trait Schedule {
    fn tick<T: TimeSource>(&mut self, is_paired: bool, time: &T) -> SchedulerResult;
}

pub struct Scheduler<K> {
    clock: K,
    config: SchedulerConfig,
    last_connect_ms: u32,
    last_sync_ms: u32,
    last_reading_unix: Option<u32>,
    last_dispatch_unix: Option<u32>,
    last_resync_unix: Option<u32>,
}

impl<K: Clock> Scheduler<K> {
    /// Rejects configurations whose periodic triggers could coincide
    pub fn new(config: SchedulerConfig, clock: K) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            clock,
            config,
            last_connect_ms: 0,
            last_sync_ms: 0,
            last_reading_unix: None,
            last_dispatch_unix: None,
            last_resync_unix: None,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn tick_unpaired(&mut self, result: &mut SchedulerResult) {
        let now = self.clock.now_ms();
        if now.wrapping_sub(self.last_connect_ms) > self.config.connect_interval_ms {
            debug!("Triggering connect attempt");
            self.last_connect_ms = now;
            result.connect_trigger = true;
        }
    }

    fn tick_unsynced(&mut self, result: &mut SchedulerResult) {
        let now = self.clock.now_ms();
        if now.wrapping_sub(self.last_sync_ms) > self.config.sync_time_interval_ms {
            debug!("Triggering time sync");
            self.last_sync_ms = now;
            result.resync_trigger = true;
        }
    }

    fn tick_operational(&mut self, unix_now: u32, result: &mut SchedulerResult) {
        let config = &self.config;
        result.reading_trigger = fire(
            unix_now,
            config.reading_interval_secs,
            0,
            &mut self.last_reading_unix,
        );
        result.dispatch_trigger = fire(
            unix_now,
            config.dispatch_interval_secs,
            config.dispatch_offset_secs,
            &mut self.last_dispatch_unix,
        );
        result.resync_trigger = fire(
            unix_now,
            config.resync_interval_secs,
            config.resync_offset_secs,
            &mut self.last_resync_unix,
        );
        if result.any() {
            debug!(
                "Unix {}: reading={} dispatch={} resync={}",
                unix_now,
                result.reading_trigger,
                result.dispatch_trigger,
                result.resync_trigger
            );
        }
    }
}

impl<K: Clock> Schedule for Scheduler<K> {
    fn tick<T: TimeSource>(&mut self, is_paired: bool, time: &T) -> SchedulerResult {
        let mut result = SchedulerResult::default();
        if !is_paired {
            self.tick_unpaired(&mut result);
        } else if !time.is_time_synced() {
            self.tick_unsynced(&mut result);
        } else {
            self.tick_operational(time.unix_time_now(), &mut result);
        }
        result
    }
}

/// Fire at most once per matching second
fn fire(now: u32, interval: u32, offset: u32, last: &mut Option<u32>) -> bool {
    if interval == 0 || now % interval != offset || *last == Some(now) {
        return false;
    }
    *last = Some(now);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use sensorunit_hal::mock::MockClock;

    struct FakeTime {
        synced: bool,
        unix: Cell<u32>,
    }

    impl FakeTime {
        fn synced_at(unix: u32) -> Self {
            Self {
                synced: true,
                unix: Cell::new(unix),
            }
        }

        fn unsynced() -> Self {
            Self {
                synced: false,
                unix: Cell::new(0),
            }
        }
    }

    impl TimeSource for FakeTime {
        fn is_time_synced(&self) -> bool {
            self.synced
        }

        fn unix_time_now(&self) -> u32 {
            self.unix.get()
        }
    }

    fn scheduler(clock: &MockClock) -> Scheduler<&MockClock> {
        Scheduler::new(SchedulerConfig::default(), clock).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let clock = MockClock::new(0);
        let config = SchedulerConfig {
            dispatch_offset_secs: 0,
            ..SchedulerConfig::default()
        };
        assert!(Scheduler::new(config, &clock).is_err());
    }

    #[test]
    fn test_unpaired_connects_on_interval() {
        let clock = MockClock::new(0);
        let mut scheduler = scheduler(&clock);
        let time = FakeTime::unsynced();

        assert!(!scheduler.tick(false, &time).connect_trigger);
        clock.set(5_000);
        assert!(!scheduler.tick(false, &time).connect_trigger);
        clock.set(5_001);
        let result = scheduler.tick(false, &time);
        assert_eq!(
            result,
            SchedulerResult {
                connect_trigger: true,
                ..SchedulerResult::default()
            }
        );
        assert!(!scheduler.tick(false, &time).connect_trigger);
        clock.set(10_002);
        assert!(scheduler.tick(false, &time).connect_trigger);
    }

    #[test]
    fn test_paired_unsynced_requests_resync() {
        let clock = MockClock::new(6_000);
        let mut scheduler = scheduler(&clock);
        let time = FakeTime::unsynced();

        let result = scheduler.tick(true, &time);

        assert!(result.resync_trigger);
        assert!(!result.connect_trigger);
        assert!(!result.reading_trigger);
        assert!(!scheduler.tick(true, &time).resync_trigger);
    }

    #[test]
    fn test_operational_triggers_follow_offsets() {
        let clock = MockClock::new(0);
        let mut scheduler = scheduler(&clock);
        let time = FakeTime::synced_at(1_800);

        assert!(scheduler.tick(true, &time).reading_trigger);
        time.unix.set(1_801);
        assert!(scheduler.tick(true, &time).dispatch_trigger);
        time.unix.set(1_802);
        assert!(scheduler.tick(true, &time).resync_trigger);
        time.unix.set(1_803);
        assert!(!scheduler.tick(true, &time).any());
    }

    #[test]
    fn test_same_second_fires_once() {
        let clock = MockClock::new(0);
        let mut scheduler = scheduler(&clock);
        let time = FakeTime::synced_at(1_801);

        assert!(scheduler.tick(true, &time).dispatch_trigger);
        assert!(!scheduler.tick(true, &time).any());
    }

    #[test]
    fn test_triggers_never_coincide() {
        let clock = MockClock::new(0);
        let mut scheduler = scheduler(&clock);
        let time = FakeTime::synced_at(0);
        let mut counts = [0u32; 3];

        for unix in 1_700_000_000..1_700_000_000 + 3_600 {
            time.unix.set(unix);
            let result = scheduler.tick(true, &time);
            let fired = [
                result.reading_trigger,
                result.dispatch_trigger,
                result.resync_trigger,
            ];
            assert!(fired.iter().filter(|f| **f).count() <= 1, "collision at {}", unix);
            for (count, hit) in counts.iter_mut().zip(fired) {
                *count += hit as u32;
            }
        }

        assert_eq!(counts, [720, 240, 6]);
    }
}
