//! Real-time pitch and formant shifting DSP engine.
//!
//! Streaming STFT core: host-sized blocks go through a pair of ring buffers
//! that decouple the block cadence from the analysis frame size; each full
//! frame is windowed, transformed, reshaped in the frequency domain (cepstral
//! envelope warp for formants, phase vocoder for pitch), resynthesized, and
//! overlap-added back into the output stream.
//!
//! Single entry point for hosts: [`RevoiceEngine::process_block`].

pub mod cepstrum;
pub mod engine;
pub mod fft;
pub mod formant;
pub mod frame;
pub mod params;
pub mod snapshot;
pub mod synthesis;
pub mod vocoder;

pub use engine::{ConfigError, RevoiceEngine, StftConfig};
pub use params::RevoiceParams;
pub use snapshot::{SnapshotPublisher, SpectrumBundle};
