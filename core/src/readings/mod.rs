//! Reading pipeline: sample, buffer, upload
//!
//! - **`buffer`**: bounded FIFO with evict-oldest and two-phase batch removal
//! - **`processor`**: turns a sensor sample into a timestamped [`Reading`]
//! - **`dispatcher`**: drains the buffer to the gateway in batches

pub mod buffer;
pub mod dispatcher;
pub mod processor;

pub use buffer::{Batch, Reading, ReadingBuffer, MAX_BATCH_SIZE, MAX_BUFFER_SIZE};
pub use dispatcher::{
    BatchOutcome, DispatchReport, ReadingsDispatcher, EMPTY_BUFFER_STATUS, ENCODE_FAILED_STATUS,
};
pub use processor::ReadingProcessor;
