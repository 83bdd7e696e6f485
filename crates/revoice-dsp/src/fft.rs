//! FFT plan pair and analysis window.

use std::f32::consts::TAU;
use std::sync::Arc;

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

/// Forward/inverse FFT plans of one size, operating in place on complex
/// buffers. The pair is unitary up to a factor of the transform length:
/// forward followed by inverse returns the input scaled by `len`.
pub struct FftPair {
    len: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl FftPair {
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            len,
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn forward(&self, buf: &mut [Complex32]) {
        debug_assert_eq!(buf.len(), self.len);
        self.forward.process(buf);
    }

    pub fn inverse(&self, buf: &mut [Complex32]) {
        debug_assert_eq!(buf.len(), self.len);
        self.inverse.process(buf);
    }
}

/// Divide by the buffer length, undoing the scaling a forward/inverse pair
/// accumulates.
pub fn normalize(buf: &mut [Complex32]) {
    let scale = 1.0 / buf.len() as f32;
    for x in buf.iter_mut() {
        *x *= scale;
    }
}

/// Hann window: `w[i] = 0.5 (1 - cos(2 pi i / len))`.
///
/// Periodic form (denominator `len`, not `len - 1`), which is the variant
/// that tiles exactly under overlap-add.
pub fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 * (1.0 - (TAU * i as f32 / len as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_scales_by_len() {
        let n = 1024;
        let fft = FftPair::new(n);
        let original: Vec<Complex32> = (0..n)
            .map(|i| Complex32::new((i as f32 * 0.37).sin(), 0.0))
            .collect();

        let mut buf = original.clone();
        fft.forward(&mut buf);
        fft.inverse(&mut buf);

        for (x, y) in buf.iter().zip(original.iter()) {
            let expected = y * n as f32;
            assert!((x - expected).norm() <= 1e-5 * n as f32);
        }
    }

    #[test]
    fn normalize_undoes_round_trip() {
        let n = 256;
        let fft = FftPair::new(n);
        let original: Vec<Complex32> = (0..n)
            .map(|i| Complex32::new((i as f32 * 0.11).cos(), 0.0))
            .collect();

        let mut buf = original.clone();
        fft.forward(&mut buf);
        fft.inverse(&mut buf);
        normalize(&mut buf);

        for (x, y) in buf.iter().zip(original.iter()) {
            assert!((x - y).norm() < 1e-4);
        }
    }

    #[test]
    fn sine_concentrates_in_one_bin() {
        let n = 512;
        let fft = FftPair::new(n);
        let bin = 20;
        let mut buf: Vec<Complex32> = (0..n)
            .map(|i| Complex32::new((TAU * bin as f32 * i as f32 / n as f32).sin(), 0.0))
            .collect();
        fft.forward(&mut buf);

        let peak = buf
            .iter()
            .take(n / 2)
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, bin);
    }

    #[test]
    fn hann_endpoints_and_midpoint() {
        let w = hann_window(8);
        assert!(w[0].abs() < 1e-7);
        assert!((w[4] - 1.0).abs() < 1e-7);
        // Periodic window: w[i] + w[i + len/2] == 1
        for i in 0..4 {
            assert!((w[i] + w[i + 4] - 1.0).abs() < 1e-6);
        }
    }
}
