//! Parameter schema for the pitch/formant shifter.
//!
//! All callers (CLI, plugin) use the same `RevoiceParams` struct. Shift
//! amounts are expressed in percent: +100 is one octave up, -100 one octave
//! down, with the multiplicative factor `2^(percent / 100)`.

use serde::{Deserialize, Serialize};

/// Admissible analysis frame sizes.
pub const FFT_SIZE_OPTIONS: &[usize] = &[256, 512, 1024, 2048, 4096, 8192, 16384];

/// Admissible overlap factors (frames covering any one sample).
pub const OVERLAP_OPTIONS: &[usize] = &[2, 4, 8, 16, 32, 64];

pub const ENVELOPE_ORDER_MIN: usize = 2;
pub const ENVELOPE_ORDER_MAX: usize = 90;

pub const OUTPUT_GAIN_MIN_DB: f32 = -48.0;
pub const OUTPUT_GAIN_MAX_DB: f32 = 6.0;
/// Gains at or below this level are treated as silence.
pub const OUTPUT_GAIN_SILENT_DB: f32 = -47.9;

/// User-facing processing parameters.
///
/// `fft_size` and `overlap` are structural (changing them reconfigures the
/// engine); the rest apply per block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevoiceParams {
    pub fft_size: usize,
    pub overlap: usize,
    /// Pitch shift in percent, -100..=100.
    pub pitch: f32,
    /// Formant shift in percent, -100..=100.
    pub formant: f32,
    /// Cepstral liftering cutoff, 2..=90.
    pub envelope_order: usize,
    /// Dry/wet blend, 0..=1.
    pub dry_wet: f32,
    /// Output gain in dB, -48..=6; values at or below -47.9 mute.
    pub output_gain_db: f32,
}

impl Default for RevoiceParams {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            overlap: 8,
            pitch: 0.0,
            formant: 0.0,
            envelope_order: 20,
            dry_wet: 0.5,
            output_gain_db: 0.0,
        }
    }
}

impl RevoiceParams {
    /// Parse a JSON preset, filling missing fields from defaults. A preset
    /// that fails to parse at all falls back to defaults with a warning on
    /// stderr.
    pub fn from_json_with_defaults(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(params) => params,
            Err(err) => {
                eprintln!("preset ignored ({err}); using defaults");
                Self::default()
            }
        }
    }

    /// Multiplicative pitch factor `2^(pitch / 100)`.
    pub fn pitch_amount(&self) -> f32 {
        (self.pitch / 100.0).exp2()
    }

    /// Multiplicative formant warp factor `2^(formant / 100)`.
    pub fn formant_amount(&self) -> f32 {
        (self.formant / 100.0).exp2()
    }
}

/// Decibels to linear gain, with a silence floor: anything at or below
/// [`OUTPUT_GAIN_SILENT_DB`] maps to exactly zero.
pub fn db_to_gain(db: f32) -> f32 {
    if db <= OUTPUT_GAIN_SILENT_DB {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_plugin_defaults() {
        let p = RevoiceParams::default();
        assert_eq!(p.fft_size, 1024);
        assert_eq!(p.overlap, 8);
        assert_eq!(p.envelope_order, 20);
        assert_eq!(p.dry_wet, 0.5);
    }

    #[test]
    fn shift_amounts_are_octaves_at_extremes() {
        let mut p = RevoiceParams::default();
        p.pitch = 100.0;
        p.formant = -100.0;
        assert!((p.pitch_amount() - 2.0).abs() < 1e-6);
        assert!((p.formant_amount() - 0.5).abs() < 1e-6);

        p.pitch = 0.0;
        assert!((p.pitch_amount() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn partial_preset_fills_defaults() {
        let p = RevoiceParams::from_json_with_defaults(r#"{"pitch": 50.0}"#);
        assert_eq!(p.pitch, 50.0);
        assert_eq!(p.fft_size, 1024);
        assert_eq!(p.envelope_order, 20);
    }

    #[test]
    fn malformed_preset_falls_back_to_defaults() {
        let p = RevoiceParams::from_json_with_defaults("not json");
        assert_eq!(p, RevoiceParams::default());
    }

    #[test]
    fn gain_silence_floor() {
        assert_eq!(db_to_gain(-48.0), 0.0);
        assert_eq!(db_to_gain(-47.9), 0.0);
        assert!((db_to_gain(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_gain(6.0) - 1.9953).abs() < 1e-3);
    }
}
