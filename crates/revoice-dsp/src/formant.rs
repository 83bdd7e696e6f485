//! Formant shifting by resampling the log-magnitude envelope along the
//! frequency axis.

use num_complex::Complex32;

/// Log-magnitude value assumed outside the representable band; `exp` of it
/// saturates to near-silence instead of wrapping spectral content around.
const OUT_OF_BAND: f32 = -1000.0;

/// Warps envelopes in place; owns a scratch copy of the unwarped values so
/// reads never alias writes.
pub struct FormantWarper {
    scratch: Vec<f32>,
}

impl FormantWarper {
    pub fn new(len: usize) -> Self {
        Self {
            scratch: vec![0.0; len],
        }
    }

    /// Stretch the envelope by `amount` along the frequency axis: the value
    /// at bin `k` becomes the interpolated value at `k / amount`. Only the
    /// real (log-magnitude) part is rewritten; the lower half is mirrored
    /// into the upper half.
    pub fn warp(&mut self, envelope: &mut [Complex32], amount: f32) {
        let n = envelope.len();
        let half = n / 2;

        for (dst, src) in self.scratch.iter_mut().zip(envelope.iter()) {
            *dst = src.re;
        }

        for k in 0..=half {
            let pos = k as f32 / amount;
            let left_index = pos.floor() as usize;
            let frac = pos - left_index as f32;

            let left = if left_index <= half {
                self.scratch[left_index]
            } else {
                OUT_OF_BAND
            };
            let right = if left_index + 1 <= half {
                self.scratch[left_index + 1]
            } else {
                OUT_OF_BAND
            };

            envelope[k].re = (1.0 - frac) * left + frac * right;
        }

        for k in 1..=half {
            envelope[n - k].re = envelope[k].re;
        }
    }
}
