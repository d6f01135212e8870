#![deny(unsafe_code)]
#![deny(warnings)]
//! Batched upload of buffered readings
//!
//! The buffer is drained oldest-first, one `POST /readings` per batch. The
//! first failed POST ends the round and leaves its batch buffered for the
//! next one. Every successful reply can also carry `"status":"disconnected"`,
//! which commits that batch and ends the round with a request to unpair.
//!
//! Delivery is at-least-once: a reset between the 200 and the commit resends
//! the batch, so the gateway must deduplicate on `(sensor, timestamp)`.

use super::buffer::ReadingBuffer;
use crate::network::json::{compose_readings, parse_dispatch_response};
use crate::network::{RestApi, READINGS_PATH};

/// Status reported when there was nothing to send
pub const EMPTY_BUFFER_STATUS: i32 = -7;
/// Status reported when a batch does not fit the request JSON buffer. Nothing
/// was sent and the batch stays buffered.
pub const ENCODE_FAILED_STATUS: i32 = -8;

/// Result of one POST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatchOutcome {
    /// HTTP status, negative for local failures
    pub status: i32,
    /// Readings committed (removed from the buffer)
    pub sent: usize,
    pub stay_connected: bool,
}

/// Result of a whole dispatch round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DispatchReport {
    /// 200 when the buffer was drained, else the status that stopped the round:
    /// an HTTP status, an [`HttpError`](crate::network::HttpError) code (-1 to
    /// -6), [`EMPTY_BUFFER_STATUS`] or [`ENCODE_FAILED_STATUS`]
    pub status: i32,
    pub batches_sent: usize,
    pub readings_sent: usize,
    /// False only when the gateway asked this unit to disconnect
    pub stay_connected: bool,
}

impl DispatchReport {
    pub fn succeeded(&self) -> bool {
        self.status == 200
    }
}

pub struct ReadingsDispatcher {
    sensor_unit_id: &'static str,
}

impl ReadingsDispatcher {
    pub fn new(sensor_unit_id: &'static str) -> Self {
        Self { sensor_unit_id }
    }

    /// Upload batches until the buffer is empty, a POST fails, or the gateway
    /// says disconnect
    pub fn dispatch<R: RestApi, const N: usize>(
        &self,
        rest: &mut R,
        buffer: &mut ReadingBuffer<N>,
    ) -> DispatchReport {
        let mut report = DispatchReport {
            status: EMPTY_BUFFER_STATUS,
            batches_sent: 0,
            readings_sent: 0,
            stay_connected: true,
        };
        if !buffer.has_readings() {
            debug!("Nothing to dispatch");
            return report;
        }
        info!("Dispatching {} readings", buffer.len());

        while buffer.has_readings() {
            let outcome = self.dispatch_batch(rest, buffer);
            report.status = outcome.status;
            if outcome.status != 200 {
                warn!(
                    "Dispatch aborted with status {}, {} readings kept",
                    outcome.status,
                    buffer.len()
                );
                return report;
            }
            report.batches_sent += 1;
            report.readings_sent += outcome.sent;
            if !outcome.stay_connected {
                info!("Gateway requested disconnect");
                report.stay_connected = false;
                return report;
            }
        }

        report
    }

    /// Upload the oldest batch, committing it only on `200 OK`
    pub fn dispatch_batch<R: RestApi, const N: usize>(
        &self,
        rest: &mut R,
        buffer: &mut ReadingBuffer<N>,
    ) -> BatchOutcome {
        if !buffer.has_readings() {
            warn!("Reading buffer already empty, nothing to dispatch");
            return BatchOutcome {
                status: EMPTY_BUFFER_STATUS,
                sent: 0,
                stay_connected: true,
            };
        }

        let batch = buffer.get_batch();
        let payload = match compose_readings(self.sensor_unit_id, &batch) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Cannot encode batch: {}", e);
                return BatchOutcome {
                    status: ENCODE_FAILED_STATUS,
                    sent: 0,
                    stay_connected: true,
                };
            }
        };

        debug!("Posting batch of {} readings", batch.len());
        let response = rest.post_to(READINGS_PATH, payload.as_str());
        if !response.is_ok() {
            warn!("Posting readings failed with status {}", response.status);
            return BatchOutcome {
                status: response.status,
                sent: 0,
                stay_connected: true,
            };
        }

        let sent = buffer.remove_batch(batch.len());
        info!("{} readings delivered", sent);

        let stay_connected = match parse_dispatch_response(response.body()) {
            Ok(stay) => stay,
            Err(e) => {
                warn!("Unreadable dispatch reply, staying connected: {}", e);
                true
            }
        };

        BatchOutcome {
            status: response.status,
            sent,
            stay_connected,
        }
    }
}
