//! Streaming engine: adapts arbitrary host block sizes to the fixed analysis
//! frame cadence.
//!
//! Incoming samples accumulate in the input ring buffer; every time it fills,
//! one frame is processed and one hop of output becomes available. The output
//! ring buffer is primed with enough silence that a read can always satisfy
//! the host, whatever the block/hop phase relationship, at the cost of a
//! fixed latency of `fft_size + max_block - hop` samples.

use std::fmt;
use std::sync::Arc;

use shared_dsp::RingBuffer;

use crate::frame::FrameProcessor;
use crate::params::{
    db_to_gain, RevoiceParams, FFT_SIZE_OPTIONS, OUTPUT_GAIN_MAX_DB, OUTPUT_GAIN_MIN_DB,
    OVERLAP_OPTIONS,
};
use crate::snapshot::SnapshotPublisher;

/// Hard ceiling applied after the output gain.
const CLIP_LIMIT: f32 = 1.5;

/// Structural engine configuration; changing any field rebuilds all buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StftConfig {
    /// Analysis frame size `N`.
    pub fft_size: usize,
    /// Overlap factor `O`; the hop is `N / O`.
    pub overlap: usize,
    /// Channel count.
    pub channels: usize,
    /// Upper bound on the host block length.
    pub max_block: usize,
}

impl StftConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !FFT_SIZE_OPTIONS.contains(&self.fft_size) {
            return Err(ConfigError::FftSize(self.fft_size));
        }
        if !OVERLAP_OPTIONS.contains(&self.overlap) {
            return Err(ConfigError::Overlap(self.overlap));
        }
        if self.channels == 0 {
            return Err(ConfigError::Channels(self.channels));
        }
        if self.max_block == 0 {
            return Err(ConfigError::MaxBlock(self.max_block));
        }
        Ok(())
    }

    /// Samples advanced between successive analysis frames.
    pub fn hop(&self) -> usize {
        self.fft_size / self.overlap
    }

    /// Fixed delay from input to output.
    pub fn latency(&self) -> usize {
        self.fft_size + self.max_block - self.hop()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    FftSize(usize),
    Overlap(usize),
    Channels(usize),
    MaxBlock(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FftSize(n) => write!(f, "unsupported FFT size {n}"),
            ConfigError::Overlap(o) => write!(f, "unsupported overlap factor {o}"),
            ConfigError::Channels(c) => write!(f, "unsupported channel count {c}"),
            ConfigError::MaxBlock(b) => write!(f, "unsupported maximum block size {b}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// The streaming pitch/formant shifter.
pub struct RevoiceEngine {
    config: StftConfig,
    input: RingBuffer<f32>,
    output: RingBuffer<f32>,
    frame: FrameProcessor,
    publisher: Arc<SnapshotPublisher>,
    wet: Vec<Vec<f32>>,
}

impl RevoiceEngine {
    pub fn new(config: StftConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let publisher = Arc::new(SnapshotPublisher::new(
            config.channels,
            config.fft_size,
            config.max_block,
        ));
        let mut engine = Self {
            config,
            input: RingBuffer::new(config.channels, config.fft_size),
            output: RingBuffer::new(config.channels, config.fft_size + config.max_block),
            frame: FrameProcessor::new(config.channels, config.fft_size, config.overlap),
            publisher,
            wet: vec![vec![0.0; config.max_block]; config.channels],
        };
        engine.prime();
        Ok(engine)
    }

    /// Swap in a new configuration, rebuilding every buffer. On error the
    /// previous configuration stays live and untouched.
    pub fn reconfigure(&mut self, config: StftConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if config == self.config {
            return Ok(());
        }

        self.config = config;
        self.input = RingBuffer::new(config.channels, config.fft_size);
        self.output = RingBuffer::new(config.channels, config.fft_size + config.max_block);
        self.frame = FrameProcessor::new(config.channels, config.fft_size, config.overlap);
        self.wet = vec![vec![0.0; config.max_block]; config.channels];
        self.publisher
            .reconfigure(config.channels, config.fft_size, config.max_block);
        self.prime();
        Ok(())
    }

    /// Return to the post-construction state without reallocating.
    pub fn reset(&mut self) {
        self.frame.reset();
        self.input.discard_all();
        self.output.discard_all();
        self.prime();
    }

    /// Pre-fill both rings so the first frame triggers after one hop of live
    /// input and output reads can never underrun.
    fn prime(&mut self) {
        let n = self.config.fft_size;
        let hop = self.config.hop();
        let filled = self.input.fill(n - hop, 0.0);
        debug_assert!(filled);
        let filled = self.output.fill(n + self.config.max_block - hop, 0.0);
        debug_assert!(filled);
    }

    pub fn config(&self) -> &StftConfig {
        &self.config
    }

    /// Fixed input-to-output delay in samples.
    pub fn latency_samples(&self) -> usize {
        self.config.latency()
    }

    pub fn publisher(&self) -> &Arc<SnapshotPublisher> {
        &self.publisher
    }

    /// Process one host block in place: `block[ch]` holds the dry input and
    /// receives the mixed, gain-staged, clipped output. All channel slices
    /// must share one length; blocks longer than `max_block` are handled in
    /// `max_block` pieces.
    pub fn process_block(&mut self, block: &mut [&mut [f32]], params: &RevoiceParams) {
        debug_assert_eq!(block.len(), self.config.channels);

        let len = block.first().map_or(0, |ch| ch.len());
        let wet_level = params.dry_wet.clamp(0.0, 1.0);
        let dry_level = 1.0 - wet_level;
        let gain = db_to_gain(params.output_gain_db.clamp(OUTPUT_GAIN_MIN_DB, OUTPUT_GAIN_MAX_DB));

        let mut start = 0;
        while start < len {
            let chunk = (len - start).min(self.config.max_block);
            self.process_chunk(block, start, chunk, params, dry_level, wet_level, gain);
            start += chunk;
        }
    }

    fn process_chunk(
        &mut self,
        block: &mut [&mut [f32]],
        start: usize,
        len: usize,
        params: &RevoiceParams,
        dry_level: f32,
        wet_level: f32,
        gain: f32,
    ) {
        let mut consumed = 0;
        while consumed < len {
            let writable = self.input.writable();
            debug_assert!(writable > 0);
            let count = writable.min(len - consumed);

            let wrote = self.input.write(&*block, start + consumed, count);
            debug_assert!(wrote);

            if self.input.is_full() {
                self.frame
                    .process_frame(params, &mut self.input, &mut self.output, &self.publisher);
            }

            let read = self.output.read(&mut self.wet, consumed, count);
            debug_assert!(read, "output ring underrun");

            consumed += count;
        }

        for (ch, dry) in block.iter_mut().enumerate() {
            let dry = &mut dry[start..start + len];
            let wet = &self.wet[ch][..len];
            for (d, &w) in dry.iter_mut().zip(wet.iter()) {
                *d = ((*d * dry_level + w * wet_level) * gain).clamp(-CLIP_LIMIT, CLIP_LIMIT);
            }
        }

        self.publisher.publish_waveform(&*block, start, len);
    }
}
