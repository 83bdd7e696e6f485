//! Recombination of warped envelope, fine structure, and vocoder phases into
//! the synthesis spectrum.
//!
//! When pitch is shifted down, the spectrum falls off a cliff at the shifted
//! Nyquist position. Seen as a waveform along the frequency axis that edge is
//! a discontinuity the low-order envelope cannot follow, so it would leak
//! into the fine structure and come back as high-frequency noise. Mirroring
//! the log-amplitude spectrum around the shifted Nyquist before extracting
//! the fine structure removes the edge; the mirrored region's fine structure
//! is then discarded outright.

use num_complex::Complex32;

/// Record the phase of every bin (taken before any mirroring rewrites the
/// spectrum).
pub fn capture_phases(spectrum: &[Complex32], phases: &mut [f32]) {
    for (dst, x) in phases.iter_mut().zip(spectrum.iter()) {
        *dst = x.arg();
    }
}

/// Shifted-Nyquist position for a downward shift.
fn shifted_nyquist(len: usize, amount: f32) -> usize {
    (len as f32 * 0.5 * amount + 0.5).floor() as usize
}

/// Reflect the spectrum below the shifted Nyquist into the dead band above
/// it. No-op unless `amount < 1`.
pub fn mirror_above_shifted_nyquist(spectrum: &mut [Complex32], amount: f32) {
    if amount >= 1.0 {
        return;
    }

    let n = spectrum.len();
    let half = n / 2;
    let m = shifted_nyquist(n, amount);

    for i in 0.. {
        if m + i >= half || i > m {
            break;
        }
        spectrum[m + i] = spectrum[m - i];
    }

    for k in 1..half {
        spectrum[n - k] = spectrum[k].conj();
    }
}

/// Zero the fine structure over the mirrored band. No-op unless `amount < 1`.
pub fn suppress_mirrored_fine_structure(fine: &mut [Complex32], amount: f32) {
    if amount >= 1.0 {
        return;
    }

    let n = fine.len();
    let half = n / 2;
    let m = shifted_nyquist(n, amount);

    for value in &mut fine[m.min(half)..half] {
        *value = Complex32::new(0.0, 0.0);
    }

    for k in 1..half {
        fine[n - k] = fine[k];
    }
}

/// Rebuild the synthesis spectrum: amplitude from the summed log components,
/// phase from the vocoder output.
pub fn recombine(
    spectrum: &mut [Complex32],
    envelope: &[Complex32],
    fine: &[Complex32],
    phases: &[f32],
) {
    let n = spectrum.len();
    let half = n / 2;

    for k in 0..=half {
        let amplitude = (envelope[k].re + fine[k].re).exp();
        spectrum[k] = Complex32::from_polar(amplitude, phases[k]);
    }

    for k in 1..half {
        spectrum[n - k] = spectrum[k].conj();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_is_a_no_op_for_upward_shifts() {
        let n = 64;
        let original: Vec<Complex32> =
            (0..n).map(|k| Complex32::new(k as f32, -(k as f32))).collect();
        let mut spectrum = original.clone();
        mirror_above_shifted_nyquist(&mut spectrum, 1.5);
        assert_eq!(spectrum, original);
    }

    #[test]
    fn mirror_reflects_around_shifted_nyquist() {
        let n = 64;
        let mut spectrum: Vec<Complex32> =
            (0..n).map(|k| Complex32::new(k as f32, 0.0)).collect();
        // amount 0.5 puts the shifted Nyquist at bin 16.
        mirror_above_shifted_nyquist(&mut spectrum, 0.5);

        assert_eq!(spectrum[16].re, 16.0);
        assert_eq!(spectrum[17].re, 15.0);
        assert_eq!(spectrum[20].re, 12.0);
        assert_eq!(spectrum[31].re, 1.0);
        // Upper half is the conjugate mirror of the lower half.
        for k in 1..n / 2 {
            assert_eq!(spectrum[n - k], spectrum[k].conj());
        }
    }

    #[test]
    fn suppression_zeroes_the_mirrored_band() {
        let n = 64;
        let mut fine: Vec<Complex32> = (0..n).map(|k| Complex32::new(1.0 + k as f32, 0.0)).collect();
        suppress_mirrored_fine_structure(&mut fine, 0.5);

        for k in 16..n / 2 {
            assert_eq!(fine[k].re, 0.0, "bin {k}");
        }
        assert_ne!(fine[15].re, 0.0);
        for k in 1..n / 2 {
            assert_eq!(fine[n - k], fine[k]);
        }
    }

    #[test]
    fn recombine_sums_log_components() {
        let n = 32;
        let envelope = vec![Complex32::new(0.5, 0.0); n];
        let fine = vec![Complex32::new(0.25, 0.0); n];
        let phases = vec![0.0f32; n];
        let mut spectrum = vec![Complex32::new(0.0, 0.0); n];

        recombine(&mut spectrum, &envelope, &fine, &phases);

        let expected = 0.75f32.exp();
        for k in 0..=n / 2 {
            assert!((spectrum[k].re - expected).abs() < 1e-5);
            assert!(spectrum[k].im.abs() < 1e-6);
        }
    }

    #[test]
    fn recombine_uses_captured_phases() {
        let n = 32;
        let envelope = vec![Complex32::new(0.0, 0.0); n];
        let fine = vec![Complex32::new(0.0, 0.0); n];
        let mut phases = vec![0.0f32; n];
        phases[3] = std::f32::consts::FRAC_PI_2;
        let mut spectrum = vec![Complex32::new(0.0, 0.0); n];

        recombine(&mut spectrum, &envelope, &fine, &phases);

        assert!(spectrum[3].re.abs() < 1e-6);
        assert!((spectrum[3].im - 1.0).abs() < 1e-6);
        assert_eq!(spectrum[n - 3], spectrum[3].conj());
    }
}
