/*!
# Shared Types and Utilities

This crate contains common types shared between the Rust components of
the oscilloscope client.

## Core Types

- [`CommandCode`] - Single-byte device command token
- [`Timebase`] - Supported sampling durations per division
- [`TriggerEdge`] - Trigger edge selection
- [`Frame`] - Complete decoded sample buffer

## Modules

- [`codec`] - Binary command protocol encoding
- [`frame`] - Frame decoding and statistics
- [`error`] - Common error types
*/

pub mod codec;
pub mod error;
pub mod frame;

// Re-export commonly used types
pub use codec::{encode_trigger_enable, CommandCode, Timebase, TriggerEdge};
pub use codec::{START_CAPTURE, TRIGGER_DISABLE, TRIGGER_ENABLE};
pub use error::{Result, ScopeError};
pub use frame::Frame;

/// Version information for the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol constants
pub mod protocol {
    /// Number of samples in one capture frame (device buffer capacity)
    pub const BUFFER_SIZE: usize = 512;

    /// Fixed serial link speed in baud
    pub const BAUD_RATE: u32 = 115_200;

    /// Full-scale input voltage; raw samples map linearly onto [0, full scale)
    pub const FULL_SCALE_VOLTS: f32 = 5.0;

    /// Number of distinct raw sample levels (one byte per sample)
    pub const ADC_LEVELS: f32 = 256.0;

    /// Samples per screen division; timebase values are durations per division
    pub const SAMPLES_PER_DIVISION: usize = 10;
}
