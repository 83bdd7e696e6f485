//! Per-frame orchestration: one full analysis frame in, one synthesized
//! frame overlap-added out.

use num_complex::Complex32;
use shared_dsp::{LinearSmoothed, RingBuffer};

use crate::cepstrum::CepstrumAnalyzer;
use crate::fft::{self, hann_window, FftPair};
use crate::formant::FormantWarper;
use crate::params::{RevoiceParams, ENVELOPE_ORDER_MAX, ENVELOPE_ORDER_MIN};
use crate::snapshot::{SnapshotPublisher, SpectrumBundle};
use crate::synthesis;
use crate::vocoder::PhaseVocoder;

/// Ramp length of the gain-compensation smoother, in frames.
const GAIN_RAMP_FRAMES: u32 = 10;

/// Runs the spectral pipeline on one analysis frame per channel and writes
/// the result back through overlap-add. Owns every scratch buffer it needs,
/// so a frame never allocates.
pub struct FrameProcessor {
    fft: FftPair,
    window: Vec<f32>,
    overlap_factor: usize,
    hop: usize,
    time_in: Vec<Vec<Complex32>>,
    spectrum: Vec<Complex32>,
    phases: Vec<f32>,
    cepstrum: CepstrumAnalyzer,
    warper: FormantWarper,
    vocoder: PhaseVocoder,
    gain: Vec<LinearSmoothed>,
    out_frame: Vec<Vec<f32>>,
    staged: Vec<SpectrumBundle>,
}

impl FrameProcessor {
    pub fn new(channels: usize, fft_size: usize, overlap_factor: usize) -> Self {
        let hop = fft_size / overlap_factor;
        Self {
            fft: FftPair::new(fft_size),
            window: hann_window(fft_size),
            overlap_factor,
            hop,
            time_in: vec![vec![Complex32::new(0.0, 0.0); fft_size]; channels],
            spectrum: vec![Complex32::new(0.0, 0.0); fft_size],
            phases: vec![0.0; fft_size],
            cepstrum: CepstrumAnalyzer::new(fft_size),
            warper: FormantWarper::new(fft_size),
            vocoder: PhaseVocoder::new(channels, fft_size, hop),
            gain: (0..channels).map(|_| LinearSmoothed::new(0.0, GAIN_RAMP_FRAMES)).collect(),
            out_frame: vec![vec![0.0; fft_size]; channels],
            staged: vec![SpectrumBundle::new(fft_size); channels],
        }
    }

    /// Clear phase and gain state (configuration changes only).
    pub fn reset(&mut self) {
        self.vocoder.reset();
        for gain in &mut self.gain {
            gain.reset(0.0);
        }
        for staged in &mut self.staged {
            staged.clear();
        }
    }

    /// Process the frame currently filling `input`: analyze, shift, and
    /// resynthesize every channel, overlap-add the result into `output`,
    /// consume one hop of input, and publish the frame's spectra.
    pub fn process_frame(
        &mut self,
        params: &RevoiceParams,
        input: &mut RingBuffer<f32>,
        output: &mut RingBuffer<f32>,
        publisher: &SnapshotPublisher,
    ) {
        let n = self.fft.len();
        let channels = self.time_in.len();
        let formant_amount = params.formant_amount();
        let pitch_amount = params.pitch_amount();
        let order = params
            .envelope_order
            .clamp(ENVELOPE_ORDER_MIN, ENVELOPE_ORDER_MAX);

        debug_assert!(input.is_full());
        debug_assert_eq!(input.readable(), n);

        // Window the frame out of the ring buffer's readable view, scaled so
        // the overlapping frames sum back to unit weight.
        {
            let time_in = &mut self.time_in;
            let window = &self.window;
            let scale = 1.0 / self.overlap_factor as f32;
            input.read_without_copy(|ch, head, tail| {
                let frame = &mut time_in[ch];
                for (i, &x) in head.iter().chain(tail.iter()).enumerate() {
                    frame[i] = Complex32::new(x * window[i] * scale, 0.0);
                }
            });
        }

        for ch in 0..channels {
            let power_in: f64 = self.time_in[ch].iter().map(|c| c.norm_sqr() as f64).sum();

            self.spectrum.copy_from_slice(&self.time_in[ch]);
            self.fft.forward(&mut self.spectrum);

            let staged = &mut self.staged[ch];
            staged.original_spectrum.copy_from_slice(&self.spectrum);

            // Envelope from the unshifted spectrum, then warped for the
            // formant change.
            self.cepstrum.envelope(
                &self.fft,
                &self.spectrum,
                order,
                &mut staged.original_cepstrum,
                &mut staged.envelope,
            );
            self.warper.warp(&mut staged.envelope, formant_amount);

            self.vocoder.shift(ch, &mut self.spectrum, pitch_amount);
            staged.shifted_spectrum.copy_from_slice(&self.spectrum);

            // Fine structure comes from the shifted spectrum; phases are
            // captured first since the mirror fill below rewrites bins.
            synthesis::capture_phases(&self.spectrum, &mut self.phases);
            synthesis::mirror_above_shifted_nyquist(&mut self.spectrum, pitch_amount);
            self.cepstrum.fine_structure(
                &self.fft,
                &self.spectrum,
                order,
                &mut staged.fine_structure,
            );
            synthesis::suppress_mirrored_fine_structure(&mut staged.fine_structure, pitch_amount);

            synthesis::recombine(
                &mut self.spectrum,
                &staged.envelope,
                &staged.fine_structure,
                &self.phases,
            );
            staged.synthesis_spectrum.copy_from_slice(&self.spectrum);

            self.fft.inverse(&mut self.spectrum);
            fft::normalize(&mut self.spectrum);

            let out = &mut self.out_frame[ch];
            for i in 0..n {
                out[i] = self.spectrum[i].re * self.window[i];
            }

            // The resynthesized frame's level drifts with the shift amounts;
            // pull it back to the analysis frame's power, ramped to avoid
            // frame-rate gain steps.
            let power_out: f64 = out.iter().map(|&x| x as f64 * x as f64).sum();
            let target = if power_out > 0.0 {
                (power_in / power_out).sqrt() as f32
            } else {
                1.0
            };
            self.gain[ch].set_target(target);
            let gain = self.gain[ch].next();
            for x in out.iter_mut() {
                *x *= gain;
            }

            if out.iter().any(|x| !x.is_finite()) {
                out.fill(0.0);
            }
        }

        let wrote = output.overlap_add(&self.out_frame, n - self.hop);
        debug_assert!(wrote, "output ring must absorb a full frame");
        let dropped = input.discard(self.hop);
        debug_assert!(dropped);

        publisher.publish_spectra(&self.staged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn full_input_ring(n: usize, freq_bins: f32, offset: usize) -> RingBuffer<f32> {
        let mut ring = RingBuffer::new(1, n);
        let samples: Vec<f32> = (0..n)
            .map(|i| (TAU * freq_bins * (offset + i) as f32 / n as f32).sin())
            .collect();
        assert!(ring.write(&[samples], 0, n));
        ring
    }

    #[test]
    fn frame_advances_both_rings() {
        let n = 512;
        let overlap = 8;
        let hop = n / overlap;
        let mut frame = FrameProcessor::new(1, n, overlap);
        let mut input = full_input_ring(n, 10.0, 0);
        let mut output: RingBuffer<f32> = RingBuffer::new(1, 2 * n);
        assert!(output.fill(n - hop, 0.0));
        let publisher = SnapshotPublisher::new(1, n, 64);
        let params = RevoiceParams::default();

        frame.process_frame(&params, &mut input, &mut output, &publisher);

        assert_eq!(input.readable(), n - hop);
        assert_eq!(output.readable(), n);
    }

    #[test]
    fn output_is_finite_for_extreme_settings() {
        let n = 256;
        let overlap = 2;
        let hop = n / overlap;
        let mut frame = FrameProcessor::new(1, n, overlap);
        let mut output: RingBuffer<f32> = RingBuffer::new(1, 8 * n);
        assert!(output.fill(n - hop, 0.0));
        let publisher = SnapshotPublisher::new(1, n, 64);

        let mut params = RevoiceParams::default();
        params.pitch = -100.0;
        params.formant = 100.0;
        params.envelope_order = 2;

        for pass in 0..4 {
            let mut input = full_input_ring(n, 3.0, pass * hop);
            frame.process_frame(&params, &mut input, &mut output, &publisher);
        }

        let readable = output.readable();
        let mut dest = vec![vec![0.0f32; readable]];
        assert!(output.read(&mut dest, 0, readable));
        assert!(dest[0].iter().all(|x| x.is_finite()));
    }

    #[test]
    fn frame_energy_is_conserved_after_warmup() {
        let n = 512;
        let overlap = 8;
        let hop = n / overlap;
        let mut frame = FrameProcessor::new(1, n, overlap);
        let publisher = SnapshotPublisher::new(1, n, 64);
        let params = RevoiceParams::default();

        let mut output: RingBuffer<f32> = RingBuffer::new(1, 64 * n);
        assert!(output.fill(n - hop, 0.0));

        // Stationary input; enough frames for the gain ramp to settle.
        for pass in 0..48 {
            let mut input = full_input_ring(n, 10.0, pass * hop);
            frame.process_frame(&params, &mut input, &mut output, &publisher);
        }

        // Compare the last frame's post-gain power against the windowed
        // analysis power of the same stationary input.
        let power_in: f64 = frame.time_in[0].iter().map(|c| c.norm_sqr() as f64).sum();
        let power_out: f64 = frame.out_frame[0].iter().map(|&x| x as f64 * x as f64).sum();
        let ratio_db = 10.0 * (power_out / power_in).log10();
        assert!(ratio_db.abs() < 1.0, "ratio {ratio_db} dB");
    }

    #[test]
    fn frame_publishes_spectra() {
        let n = 256;
        let overlap = 4;
        let hop = n / overlap;
        let mut frame = FrameProcessor::new(1, n, overlap);
        let mut input = full_input_ring(n, 8.0, 0);
        let mut output: RingBuffer<f32> = RingBuffer::new(1, 2 * n);
        assert!(output.fill(n - hop, 0.0));
        let publisher = SnapshotPublisher::new(1, n, 64);

        frame.process_frame(&RevoiceParams::default(), &mut input, &mut output, &publisher);

        let mut spectra = Vec::new();
        publisher.read_spectra(&mut spectra);
        assert_eq!(spectra.len(), 1);
        let original = &spectra[0].original_spectrum;
        assert!(original.iter().any(|c| c.norm() > 1.0));
        let peak = original
            .iter()
            .take(n / 2)
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(k, _)| k)
            .unwrap();
        assert_eq!(peak, 8);
    }
}
