//! Network module: gateway REST API and pairing
//!
//! - **`client`**: `RestApi` trait and the hand-rolled HTTP/1.1 `RestClient`
//! - **`response`**: byte-at-a-time response parser and `HttpResponse`
//! - **`error`**: negative local status codes
//! - **`json`**: bounded JSON bodies exchanged with the gateway
//! - **`manager`**: Wi-Fi discovery and the pairing handshake
//!
//! One request is one TCP connection: no keep-alive, no redirects, no
//! chunked transfer encoding.

pub mod client;
pub mod error;
pub mod json;
pub mod manager;
pub mod response;

pub use client::{RestApi, RestClient};
pub use error::HttpError;
pub use manager::{CandidateGateway, ConnectionManager, ConnectionState};
pub use response::{HttpResponse, RESPONSE_BODY_CAPACITY};

/// Pairing endpoint
pub const CONNECT_PATH: &str = "/connect";
/// Wall-clock endpoint
pub const TIME_PATH: &str = "/time";
/// Readings upload endpoint
pub const READINGS_PATH: &str = "/readings";
