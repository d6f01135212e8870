#![deny(unsafe_code)]
#![deny(warnings)]
//! Bounded reading store
//!
//! Uploads are two-phase: [`ReadingBuffer::get_batch`] copies the oldest
//! readings out without touching the buffer, and only a confirmed upload
//! commits with [`ReadingBuffer::remove_batch`]. A failed POST therefore
//! loses nothing.

use heapless::{Deque, Vec};
use serde::Serialize;

/// Default buffer capacity
pub const MAX_BUFFER_SIZE: usize = 20;
/// Most readings sent in one upload
pub const MAX_BATCH_SIZE: usize = 10;

/// Oldest-first copy of up to [`MAX_BATCH_SIZE`] readings
pub type Batch = Vec<Reading, MAX_BATCH_SIZE>;

/// One timestamped sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Unix seconds
    pub timestamp: u32,
    /// Degrees Celsius
    pub temperature: f32,
    /// Relative humidity in percent
    pub humidity: f32,
}

/// Fixed-capacity FIFO that drops its oldest reading when full
#[derive(Debug, Default)]
pub struct ReadingBuffer<const N: usize = MAX_BUFFER_SIZE> {
    readings: Deque<Reading, N>,
}

impl<const N: usize> ReadingBuffer<N> {
    pub const fn new() -> Self {
        Self {
            readings: Deque::new(),
        }
    }

    /// Append a reading, evicting the oldest one if the buffer is full
    pub fn push(&mut self, reading: Reading) {
        if self.readings.is_full() {
            if let Some(evicted) = self.readings.pop_front() {
                warn!(
                    "Reading buffer full, dropping reading from {}",
                    evicted.timestamp
                );
            }
        }
        let _ = self.readings.push_back(reading);
    }

    /// Up to [`MAX_BATCH_SIZE`] oldest readings; the buffer is left untouched
    pub fn get_batch(&self) -> Batch {
        let mut batch = Batch::new();
        for reading in self.readings.iter().take(MAX_BATCH_SIZE) {
            let _ = batch.push(*reading);
        }
        batch
    }

    /// Drop the `count` oldest readings (fewer if the buffer is shorter)
    ///
    /// Returns how many were removed.
    pub fn remove_batch(&mut self, count: usize) -> usize {
        let count = count.min(self.readings.len());
        for _ in 0..count {
            self.readings.pop_front();
        }
        count
    }

    pub fn has_readings(&self) -> bool {
        !self.readings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }
}
