#![deny(unsafe_code)]
#![deny(warnings)]
//! JSON bodies exchanged with the gateway
//!
//! | Call | Request | Response |
//! |---|---|---|
//! | `POST /connect` | `{"sensor_unit_id":"<uuid>"}` | `{"status":"connected","sensor_id":N}` |
//! | `GET /time` | - | `{"timestamp":N}` |
//! | `POST /readings` | `{"sensor_unit_id":"<uuid>","readings":[...]}` | `{"status":"..."}` |
//!
//! Everything is (de)serialized with `serde-json-core` into fixed-capacity
//! strings. Unknown response fields are ignored.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::readings::Reading;

/// Room for a readings upload (a full batch with a UUID fits comfortably)
pub const REQUEST_JSON_CAPACITY: usize = 1024;
/// Room for the pairing request
pub const SMALL_JSON_CAPACITY: usize = 128;

/// Codec failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JsonError {
    /// Output did not fit its buffer
    Serialize,
    /// Input is not the expected JSON shape
    Deserialize,
    /// A field required by the message is absent
    MissingField(&'static str),
}

impl core::fmt::Display for JsonError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Serialize => write!(f, "JSON output too large"),
            Self::Deserialize => write!(f, "Invalid JSON"),
            Self::MissingField(name) => write!(f, "Missing JSON field {}", name),
        }
    }
}

impl core::error::Error for JsonError {}

/// Parsed reply to the pairing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectResponse {
    pub connected: bool,
    /// Identity assigned by the gateway; meaningful only when connected
    pub sensor_id: u8,
}

#[derive(Serialize)]
struct ConnectRequest<'a> {
    sensor_unit_id: &'a str,
}

#[derive(Serialize)]
struct ReadingsUpload<'a> {
    sensor_unit_id: &'a str,
    readings: &'a [Reading],
}

#[derive(Deserialize)]
struct StatusBody<'a> {
    #[serde(borrow, default)]
    status: Option<&'a str>,
    #[serde(default)]
    sensor_id: Option<u8>,
}

#[derive(Deserialize)]
struct TimeBody {
    #[serde(default)]
    timestamp: Option<u32>,
}

pub fn compose_connect_request(
    sensor_unit_id: &str,
) -> Result<String<SMALL_JSON_CAPACITY>, JsonError> {
    serde_json_core::to_string(&ConnectRequest { sensor_unit_id }).map_err(|_| JsonError::Serialize)
}

pub fn compose_readings(
    sensor_unit_id: &str,
    readings: &[Reading],
) -> Result<String<REQUEST_JSON_CAPACITY>, JsonError> {
    serde_json_core::to_string(&ReadingsUpload {
        sensor_unit_id,
        readings,
    })
    .map_err(|_| JsonError::Serialize)
}

/// Paired only on `"status":"connected"`, which must carry a `sensor_id`
pub fn parse_connect_response(body: &str) -> Result<ConnectResponse, JsonError> {
    let parsed = parse_status(body)?;
    if parsed.status != Some("connected") {
        return Ok(ConnectResponse::default());
    }
    let sensor_id = parsed
        .sensor_id
        .ok_or(JsonError::MissingField("sensor_id"))?;
    Ok(ConnectResponse {
        connected: true,
        sensor_id,
    })
}

/// Unix seconds from a `/time` reply
pub fn parse_time_response(body: &str) -> Result<u32, JsonError> {
    let (parsed, _): (TimeBody, usize) =
        serde_json_core::from_str(body).map_err(|_| JsonError::Deserialize)?;
    parsed.timestamp.ok_or(JsonError::MissingField("timestamp"))
}

/// Whether the gateway wants this unit to stay paired
///
/// Anything except exactly `"disconnected"` (including no status at all)
/// means stay.
pub fn parse_dispatch_response(body: &str) -> Result<bool, JsonError> {
    let parsed = parse_status(body)?;
    Ok(parsed.status != Some("disconnected"))
}

fn parse_status(body: &str) -> Result<StatusBody<'_>, JsonError> {
    serde_json_core::from_str::<StatusBody<'_>>(body)
        .map(|(parsed, _)| parsed)
        .map_err(|_| JsonError::Deserialize)
}
