//! Platform-agnostic telemetry pipeline for the sensor unit firmware
//!
//! This crate contains the business logic that carries a battery-powered
//! sensor node from "no network" to "paired with a gateway and uploading
//! readings". It has NO hardware dependencies: boards plug in through the
//! traits in `sensorunit-hal`.
//!
//! ## Lifecycle
//!
//! ```text
//! connect ──► synchronize clock ──► sample ──► buffer ──► batch dispatch
//!    ▲                                                        │
//!    └──────────────── gateway says "disconnected" ◄──────────┘
//! ```
//!
//! ## Modules
//! - **`scheduler`**: decides once per tick which phase of work is due
//! - **`network`**: hand-rolled HTTP/1.1 client, JSON codec, gateway pairing
//! - **`time`**: wall-clock time from one round trip plus local extrapolation
//! - **`readings`**: bounded buffer, sampling and batched upload
//! - **`node`**: the outer loop wiring everything together
//!
//! Everything is single-threaded and blocking. No component allocates; every
//! collection has a compile-time capacity.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod network;
pub mod node;
pub mod readings;
pub mod scheduler;
pub mod time;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{ConnectionConfig, RestClientConfig, SchedulerConfig, TimeSyncConfig};
pub use network::{ConnectionManager, HttpError, HttpResponse, RestApi, RestClient};
pub use node::SensorNode;
pub use readings::{Reading, ReadingBuffer, ReadingProcessor, ReadingsDispatcher};
pub use scheduler::{Schedule, Scheduler, SchedulerResult};
pub use time::{TimeSource, TimeSyncManager};
