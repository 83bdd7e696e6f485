//! Phase-vocoder pitch shifting.
//!
//! Per frame and bin: estimate the true frequency from the inter-frame phase
//! advance, remap bin energy by the shift factor, then accumulate output
//! phases so successive frames stay coherent. The phase state persists across
//! frames; clearing it mid-stream causes an audible glitch, so it is reset
//! only when the engine is reconfigured.

use std::f64::consts::{PI, TAU};

use num_complex::Complex32;

/// Map a phase into the principal interval around zero.
pub fn wrap_phase(phase: f64) -> f64 {
    if phase >= 0.0 {
        (phase + PI) % TAU - PI
    } else {
        (phase - PI) % -TAU + PI
    }
}

pub struct PhaseVocoder {
    len: usize,
    hop: usize,
    prev_input_phase: Vec<Vec<f32>>,
    prev_output_phase: Vec<Vec<f32>>,
    analysis_magnitude: Vec<f64>,
    analysis_frequency: Vec<f64>,
    synthesis_magnitude: Vec<f64>,
    synthesis_frequency: Vec<f64>,
}

impl PhaseVocoder {
    pub fn new(channels: usize, len: usize, hop: usize) -> Self {
        Self {
            len,
            hop,
            prev_input_phase: vec![vec![0.0; len]; channels],
            prev_output_phase: vec![vec![0.0; len]; channels],
            analysis_magnitude: vec![0.0; len],
            analysis_frequency: vec![0.0; len],
            synthesis_magnitude: vec![0.0; len],
            synthesis_frequency: vec![0.0; len],
        }
    }

    /// Clear all phase state (configuration changes only).
    pub fn reset(&mut self) {
        for ch in &mut self.prev_input_phase {
            ch.fill(0.0);
        }
        for ch in &mut self.prev_output_phase {
            ch.fill(0.0);
        }
    }

    /// Shift `spectrum` by the multiplicative factor `amount`, in place.
    ///
    /// Must be called exactly once per frame per channel: both phase arrays
    /// advance on every call.
    pub fn shift(&mut self, channel: usize, spectrum: &mut [Complex32], amount: f32) {
        let n = self.len;
        let half = n / 2;
        let hop = self.hop as f64;
        let amount = amount as f64;
        debug_assert_eq!(spectrum.len(), n);

        let prev_in = &mut self.prev_input_phase[channel];
        let prev_out = &mut self.prev_output_phase[channel];

        // Instantaneous frequency per bin from the wrapped phase advance.
        self.analysis_magnitude[..=half].fill(0.0);
        self.analysis_frequency[..=half].fill(0.0);
        for k in 0..=half {
            let magnitude = spectrum[k].norm() as f64;
            let phase = spectrum[k].arg();
            let bin_center = TAU * k as f64 / n as f64;

            let phase_advance = phase as f64 - prev_in[k] as f64;
            prev_in[k] = phase;

            let residual = wrap_phase(phase_advance - bin_center * hop);
            let deviation = residual * n as f64 / (hop * TAU);

            self.analysis_magnitude[k] = magnitude;
            self.analysis_frequency[k] = k as f64 + deviation;
        }

        // Remap bins by the shift factor, accumulating collisions.
        self.synthesis_magnitude[..=half].fill(0.0);
        self.synthesis_frequency[..=half].fill(0.0);
        for k in 0..=half {
            let source = (k as f64 / amount + 0.5).floor() as usize;
            if source > half {
                break;
            }
            self.synthesis_magnitude[k] += self.analysis_magnitude[source];
            self.synthesis_frequency[k] = self.analysis_frequency[source] * amount;
        }

        // Accumulate output phases and rebuild the spectrum.
        for k in 0..=half {
            let deviation = self.synthesis_frequency[k] - k as f64;
            let bin_center = TAU * k as f64 / n as f64;
            let phase_advance = deviation * TAU * hop / n as f64 + bin_center * hop;

            let phase = wrap_phase(prev_out[k] as f64 + phase_advance) as f32;
            spectrum[k] = Complex32::from_polar(self.synthesis_magnitude[k] as f32, phase);
            prev_out[k] = phase;
        }

        for k in 1..half {
            spectrum[n - k] = spectrum[k].conj();
        }
    }
}
