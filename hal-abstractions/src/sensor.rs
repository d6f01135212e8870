//! Temperature/humidity sensor capability

/// One raw sample as reported by the sensor driver
///
/// The driver knows nothing about wall-clock time; the pipeline stamps
/// readings after the fact.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawReading {
    /// Temperature in degrees Celsius
    pub temperature: f32,
    /// Relative humidity in percent
    pub humidity: f32,
}

/// A sensor that produces temperature and humidity samples on demand
pub trait SensorReader {
    /// Driver-specific failure
    type Error: core::fmt::Debug;

    /// Take one blocking measurement
    fn read(&mut self) -> Result<RawReading, Self::Error>;
}
