//! nih-plug parameter declarations for the Revoice plugin.
//!
//! Maps the DSP parameters to nih-plug params with the ranges and defaults
//! the engine expects. The two structural choices (FFT size, overlap) are
//! enums so hosts present the discrete options directly.

use nih_plug::prelude::*;
use revoice_dsp::RevoiceParams;

/// Analysis frame sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum FftSizeOption {
    #[name = "256"]
    Size256,
    #[name = "512"]
    Size512,
    #[name = "1024"]
    Size1024,
    #[name = "2048"]
    Size2048,
    #[name = "4096"]
    Size4096,
    #[name = "8192"]
    Size8192,
    #[name = "16384"]
    Size16384,
}

impl FftSizeOption {
    pub fn samples(self) -> usize {
        match self {
            FftSizeOption::Size256 => 256,
            FftSizeOption::Size512 => 512,
            FftSizeOption::Size1024 => 1024,
            FftSizeOption::Size2048 => 2048,
            FftSizeOption::Size4096 => 4096,
            FftSizeOption::Size8192 => 8192,
            FftSizeOption::Size16384 => 16384,
        }
    }
}

/// Overlap factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum OverlapOption {
    #[name = "2"]
    X2,
    #[name = "4"]
    X4,
    #[name = "8"]
    X8,
    #[name = "16"]
    X16,
    #[name = "32"]
    X32,
    #[name = "64"]
    X64,
}

impl OverlapOption {
    pub fn count(self) -> usize {
        match self {
            OverlapOption::X2 => 2,
            OverlapOption::X4 => 4,
            OverlapOption::X8 => 8,
            OverlapOption::X16 => 16,
            OverlapOption::X32 => 32,
            OverlapOption::X64 => 64,
        }
    }
}

#[derive(Params)]
pub struct RevoicePluginParams {
    #[id = "fft_size"]
    pub fft_size: EnumParam<FftSizeOption>,
    #[id = "overlap"]
    pub overlap: EnumParam<OverlapOption>,
    #[id = "formant"]
    pub formant: FloatParam,
    #[id = "pitch"]
    pub pitch: FloatParam,
    #[id = "env_order"]
    pub envelope_order: IntParam,
    #[id = "dry_wet"]
    pub dry_wet: FloatParam,
    #[id = "output_gain"]
    pub output_gain: FloatParam,
}

impl Default for RevoicePluginParams {
    fn default() -> Self {
        Self {
            fft_size: EnumParam::new("FFT Size", FftSizeOption::Size1024),
            overlap: EnumParam::new("Overlap", OverlapOption::X8),
            formant: FloatParam::new(
                "Formant",
                0.0,
                FloatRange::Linear {
                    min: -100.0,
                    max: 100.0,
                },
            )
            .with_unit(" %"),
            pitch: FloatParam::new(
                "Pitch",
                0.0,
                FloatRange::Linear {
                    min: -100.0,
                    max: 100.0,
                },
            )
            .with_unit(" %"),
            envelope_order: IntParam::new("Envelope Order", 20, IntRange::Linear { min: 2, max: 90 }),
            dry_wet: FloatParam::new("Dry/Wet", 0.5, FloatRange::Linear { min: 0.0, max: 1.0 })
                .with_value_to_string(formatters::v2s_f32_percentage(0))
                .with_string_to_value(formatters::s2v_f32_percentage()),
            output_gain: FloatParam::new(
                "Output Gain",
                0.0,
                FloatRange::Linear {
                    min: -48.0,
                    max: 6.0,
                },
            )
            .with_unit(" dB"),
        }
    }
}

impl RevoicePluginParams {
    /// Convert current nih-plug param values to the DSP param struct.
    pub fn to_dsp_params(&self) -> RevoiceParams {
        RevoiceParams {
            fft_size: self.fft_size.value().samples(),
            overlap: self.overlap.value().count(),
            pitch: self.pitch.value(),
            formant: self.formant.value(),
            envelope_order: self.envelope_order.value() as usize,
            dry_wet: self.dry_wet.value(),
            output_gain_db: self.output_gain.value(),
        }
    }
}
