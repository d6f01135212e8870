#![deny(unsafe_code)]
#![deny(warnings)]
//! Sampling step: sensor -> timestamped reading -> buffer

use sensorunit_hal::SensorReader;

use super::buffer::{Reading, ReadingBuffer};
use crate::time::TimeSource;

pub struct ReadingProcessor<S> {
    sensor: S,
}

impl<S: SensorReader> ReadingProcessor<S> {
    pub fn new(sensor: S) -> Self {
        Self { sensor }
    }

    /// Take one sample and buffer it
    ///
    /// Nothing is sampled while the clock is unsynced, since the reading
    /// could not be stamped. Returns whether a reading was buffered.
    pub fn process<T: TimeSource, const N: usize>(
        &mut self,
        time: &T,
        buffer: &mut ReadingBuffer<N>,
    ) -> bool {
        if !time.is_time_synced() {
            warn!("Time is not synced, skipping reading");
            return false;
        }
        let timestamp = time.unix_time_now();

        let raw = match self.sensor.read() {
            Ok(raw) => raw,
            Err(_) => {
                error!("Sensor read failed");
                return false;
            }
        };
        if !raw.temperature.is_finite() || !raw.humidity.is_finite() {
            warn!("Discarding non-finite sample");
            return false;
        }

        debug!("Temperature {} C, humidity {} %", raw.temperature, raw.humidity);
        buffer.push(Reading {
            timestamp,
            temperature: raw.temperature,
            humidity: raw.humidity,
        });
        debug!("Reading buffered at {}", timestamp);
        true
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorunit_hal::mock::MockSensorReader;

    struct FixedTime(Option<u32>);

    impl TimeSource for FixedTime {
        fn is_time_synced(&self) -> bool {
            self.0.is_some()
        }

        fn unix_time_now(&self) -> u32 {
            self.0.unwrap_or(0)
        }
    }

    #[test]
    fn test_stamps_and_buffers() {
        let mut processor = ReadingProcessor::new(MockSensorReader::new(21.5, 38.0));
        let mut buffer: ReadingBuffer = ReadingBuffer::new();

        assert!(processor.process(&FixedTime(Some(1_700_000_000)), &mut buffer));

        let batch = buffer.get_batch();
        assert_eq!(
            batch[0],
            Reading {
                timestamp: 1_700_000_000,
                temperature: 21.5,
                humidity: 38.0
            }
        );
    }

    #[test]
    fn test_unsynced_clock_skips_sensor() {
        let mut processor = ReadingProcessor::new(MockSensorReader::default());
        let mut buffer: ReadingBuffer = ReadingBuffer::new();

        assert!(!processor.process(&FixedTime(None), &mut buffer));

        assert_eq!(processor.sensor().reads, 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sensor_failure_buffers_nothing() {
        let mut processor = ReadingProcessor::new(MockSensorReader::default());
        processor.sensor_mut().fail = true;
        let mut buffer: ReadingBuffer = ReadingBuffer::new();

        assert!(!processor.process(&FixedTime(Some(5)), &mut buffer));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let mut processor = ReadingProcessor::new(MockSensorReader::new(f32::NAN, 40.0));
        let mut buffer: ReadingBuffer = ReadingBuffer::new();

        assert!(!processor.process(&FixedTime(Some(5)), &mut buffer));
        assert!(buffer.is_empty());
    }
}
