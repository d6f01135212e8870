//! Hardware abstraction traits for the sensor unit firmware
//!
//! This crate defines the capabilities the telemetry pipeline needs from a
//! board: a millisecond clock, a temperature/humidity sensor, a Wi-Fi radio and
//! a TCP connector. BSPs implement these traits; the pipeline in
//! `sensorunit-core` only ever talks to them through generics.
//!
//! ## Features
//! - **`std`**: host implementations (`StdClock`, `StdConnector`) backed by
//!   `std::time` and `std::net`
//! - **`mock`**: scriptable test doubles for every trait
//! - **`defmt`**: `defmt::Format` derives for the shared data types

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod clock;
pub mod net;
pub mod radio;
pub mod sensor;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(any(test, feature = "std"))]
pub mod std_impl;

pub use clock::Clock;
pub use net::{Connection, Connector};
pub use radio::{AccessPoint, LinkStatus, WifiRadio, SSID_MAX_LEN};
pub use sensor::{RawReading, SensorReader};
