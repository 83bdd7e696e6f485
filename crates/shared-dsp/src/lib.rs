//! Realtime-safe DSP primitives shared across the workspace.

pub mod ring_buffer;
pub mod smoothing;

pub use ring_buffer::RingBuffer;
pub use smoothing::LinearSmoothed;
