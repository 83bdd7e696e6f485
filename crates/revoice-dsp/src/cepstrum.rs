//! Cepstral liftering: spectral envelope and fine structure.
//!
//! The real cepstrum is the transform of the log-magnitude spectrum; its
//! low-quefrency coefficients describe the envelope (formants), the rest the
//! fine structure (harmonics). Keeping one side of the liftering cutoff and
//! transforming back yields the corresponding log-magnitude component.
//!
//! Convention: the *inverse* transform maps log-magnitude to quefrency, the
//! *forward* transform maps the liftered cepstrum back. The 1/N scaling of
//! the pair is applied on the quefrency side, so published cepstra carry it.

use num_complex::Complex32;

use crate::fft::{normalize, FftPair};

/// Scratch-owning analyzer; one instance serves every channel of a frame
/// processor without allocating per frame.
pub struct CepstrumAnalyzer {
    scratch: Vec<Complex32>,
}

impl CepstrumAnalyzer {
    pub fn new(len: usize) -> Self {
        Self {
            scratch: vec![Complex32::new(0.0, 0.0); len],
        }
    }

    /// Log magnitude with a floor that keeps `ln` finite without biasing
    /// audible magnitudes.
    fn load_log_magnitude(&mut self, spectrum: &[Complex32]) {
        for (dst, x) in self.scratch.iter_mut().zip(spectrum.iter()) {
            *dst = Complex32::new(x.norm().max(f32::MIN_POSITIVE).ln(), 0.0);
        }
    }

    /// Compute the spectral envelope of `spectrum`.
    ///
    /// Writes the raw cepstrum into `cepstrum` and the liftered log-magnitude
    /// envelope into `envelope` (real part carries the value; the imaginary
    /// residue of the transform is left as computed).
    pub fn envelope(
        &mut self,
        fft: &FftPair,
        spectrum: &[Complex32],
        order: usize,
        cepstrum: &mut [Complex32],
        envelope: &mut [Complex32],
    ) {
        let n = fft.len();
        debug_assert!(order >= 1 && order < n / 2);

        self.load_log_magnitude(spectrum);
        fft.inverse(&mut self.scratch);
        normalize(&mut self.scratch);
        cepstrum.copy_from_slice(&self.scratch);

        // Keep quefrencies below the cutoff, mirrored into the upper half.
        for k in 1..=n / 2 {
            if k < order {
                self.scratch[n - k] = self.scratch[k];
            } else {
                self.scratch[k] = Complex32::new(0.0, 0.0);
                self.scratch[n - k] = Complex32::new(0.0, 0.0);
            }
        }

        fft.forward(&mut self.scratch);
        envelope.copy_from_slice(&self.scratch);
    }

    /// Compute the fine structure of `spectrum`: the liftering complement of
    /// [`CepstrumAnalyzer::envelope`].
    pub fn fine_structure(
        &mut self,
        fft: &FftPair,
        spectrum: &[Complex32],
        order: usize,
        fine: &mut [Complex32],
    ) {
        let n = fft.len();
        debug_assert!(order >= 1 && order < n / 2);

        self.load_log_magnitude(spectrum);
        fft.inverse(&mut self.scratch);
        normalize(&mut self.scratch);

        // Zero quefrencies below the cutoff, keep the rest mirrored.
        self.scratch[0] = Complex32::new(0.0, 0.0);
        for k in 1..=n / 2 {
            if k >= order {
                self.scratch[n - k] = self.scratch[k];
            } else {
                self.scratch[k] = Complex32::new(0.0, 0.0);
                self.scratch[n - k] = Complex32::new(0.0, 0.0);
            }
        }

        fft.forward(&mut self.scratch);
        fine.copy_from_slice(&self.scratch);
    }
}
