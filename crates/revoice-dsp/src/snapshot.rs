//! Publication of per-frame spectral artifacts and recent output audio to
//! observers (spectrum / oscilloscope views) without stalling the audio
//! thread.
//!
//! The audio side stages data into its own scratch first, then copies it in
//! under `try_lock`; if an observer holds the mutex at that moment the frame
//! simply goes unpublished. Observers take the lock outright and must
//! tolerate stale or missing data.

use std::sync::Mutex;

use num_complex::Complex32;
use shared_dsp::RingBuffer;

/// Spectral artifacts of one processed frame for one channel.
#[derive(Clone)]
pub struct SpectrumBundle {
    pub original_spectrum: Vec<Complex32>,
    pub shifted_spectrum: Vec<Complex32>,
    pub synthesis_spectrum: Vec<Complex32>,
    pub original_cepstrum: Vec<Complex32>,
    pub envelope: Vec<Complex32>,
    pub fine_structure: Vec<Complex32>,
}

impl SpectrumBundle {
    pub fn new(len: usize) -> Self {
        let zeros = vec![Complex32::new(0.0, 0.0); len];
        Self {
            original_spectrum: zeros.clone(),
            shifted_spectrum: zeros.clone(),
            synthesis_spectrum: zeros.clone(),
            original_cepstrum: zeros.clone(),
            envelope: zeros.clone(),
            fine_structure: zeros,
        }
    }

    pub fn len(&self) -> usize {
        self.original_spectrum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original_spectrum.is_empty()
    }

    pub fn resize(&mut self, len: usize) {
        let zero = Complex32::new(0.0, 0.0);
        for field in self.fields_mut() {
            field.resize(len, zero);
        }
    }

    pub fn clear(&mut self) {
        let zero = Complex32::new(0.0, 0.0);
        for field in self.fields_mut() {
            field.fill(zero);
        }
    }

    pub fn copy_from(&mut self, src: &SpectrumBundle) {
        debug_assert_eq!(self.len(), src.len());
        self.original_spectrum.copy_from_slice(&src.original_spectrum);
        self.shifted_spectrum.copy_from_slice(&src.shifted_spectrum);
        self.synthesis_spectrum.copy_from_slice(&src.synthesis_spectrum);
        self.original_cepstrum.copy_from_slice(&src.original_cepstrum);
        self.envelope.copy_from_slice(&src.envelope);
        self.fine_structure.copy_from_slice(&src.fine_structure);
    }

    fn fields_mut(&mut self) -> [&mut Vec<Complex32>; 6] {
        [
            &mut self.original_spectrum,
            &mut self.shifted_spectrum,
            &mut self.synthesis_spectrum,
            &mut self.original_cepstrum,
            &mut self.envelope,
            &mut self.fine_structure,
        ]
    }
}

struct ObserverState {
    waveform: RingBuffer<f32>,
    spectra: Vec<SpectrumBundle>,
}

/// Mutex-guarded hand-off point between the audio thread and observers.
pub struct SnapshotPublisher {
    state: Mutex<ObserverState>,
}

impl SnapshotPublisher {
    pub fn new(channels: usize, spectrum_len: usize, waveform_len: usize) -> Self {
        Self {
            state: Mutex::new(ObserverState {
                waveform: RingBuffer::new(channels, waveform_len),
                spectra: vec![SpectrumBundle::new(spectrum_len); channels],
            }),
        }
    }

    /// Reshape the published buffers (configuration change; not called from
    /// the audio thread).
    pub fn reconfigure(&self, channels: usize, spectrum_len: usize, waveform_len: usize) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.waveform = RingBuffer::new(channels, waveform_len);
        state.spectra = vec![SpectrumBundle::new(spectrum_len); channels];
    }

    /// Publish the staged spectra of one frame. Returns `false` when an
    /// observer held the lock and the frame was skipped.
    pub fn publish_spectra(&self, staged: &[SpectrumBundle]) -> bool {
        let Ok(mut state) = self.state.try_lock() else {
            return false;
        };
        for (dst, src) in state.spectra.iter_mut().zip(staged.iter()) {
            dst.copy_from(src);
        }
        true
    }

    /// Publish `len` post-mix samples per channel starting at `offset`,
    /// evicting the oldest samples when the window is full. Returns `false`
    /// when an observer held the lock and the block was skipped.
    pub fn publish_waveform<S: AsRef<[f32]>>(&self, block: &[S], offset: usize, len: usize) -> bool {
        let Ok(mut state) = self.state.try_lock() else {
            return false;
        };
        let writable = state.waveform.writable();
        if writable < len {
            state.waveform.discard(len - writable);
        }
        state.waveform.write(block, offset, len)
    }

    /// Copy the most recent output samples into `dest`, oldest first.
    /// `dest` is resized to the window shape; slots beyond the available
    /// sample count are zeroed.
    pub fn read_waveform(&self, dest: &mut Vec<Vec<f32>>) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let channels = state.waveform.channels();
        let capacity = state.waveform.capacity();
        let available = state.waveform.readable();

        dest.resize(channels, Vec::new());
        for ch in dest.iter_mut() {
            ch.clear();
            ch.resize(capacity, 0.0);
        }
        state.waveform.peek(dest, 0, available);
    }

    /// Copy the latest per-channel spectra into `dest`, resizing as needed.
    pub fn read_spectra(&self, dest: &mut Vec<SpectrumBundle>) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let len = state.spectra.first().map_or(0, SpectrumBundle::len);

        dest.resize_with(state.spectra.len(), || SpectrumBundle::new(len));
        for (dst, src) in dest.iter_mut().zip(state.spectra.iter()) {
            if dst.len() != len {
                dst.resize(len);
            }
            dst.copy_from(src);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_spectra() {
        let publisher = SnapshotPublisher::new(2, 16, 64);
        let mut staged = vec![SpectrumBundle::new(16); 2];
        staged[1].envelope[3] = Complex32::new(4.0, -1.0);

        assert!(publisher.publish_spectra(&staged));

        let mut dest = Vec::new();
        publisher.read_spectra(&mut dest);
        assert_eq!(dest.len(), 2);
        assert_eq!(dest[1].envelope[3], Complex32::new(4.0, -1.0));
        assert_eq!(dest[0].envelope[3], Complex32::new(0.0, 0.0));
    }

    #[test]
    fn waveform_window_keeps_newest() {
        let publisher = SnapshotPublisher::new(1, 16, 4);
        assert!(publisher.publish_waveform(&[[1.0f32, 2.0, 3.0, 4.0]], 0, 4));
        assert!(publisher.publish_waveform(&[[5.0f32, 6.0]], 0, 2));

        let mut dest = Vec::new();
        publisher.read_waveform(&mut dest);
        assert_eq!(dest.len(), 1);
        assert_eq!(dest[0], vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn reader_resizes_mismatched_destination() {
        let publisher = SnapshotPublisher::new(1, 8, 4);
        let mut dest = vec![SpectrumBundle::new(3); 5];
        publisher.read_spectra(&mut dest);
        assert_eq!(dest.len(), 1);
        assert_eq!(dest[0].len(), 8);
    }

    #[test]
    fn reconfigure_reshapes_published_state() {
        let publisher = SnapshotPublisher::new(1, 8, 4);
        publisher.reconfigure(2, 32, 8);

        let mut dest = Vec::new();
        publisher.read_spectra(&mut dest);
        assert_eq!(dest.len(), 2);
        assert_eq!(dest[0].len(), 32);

        let mut wave = Vec::new();
        publisher.read_waveform(&mut wave);
        assert_eq!(wave.len(), 2);
        assert_eq!(wave[0].len(), 8);
    }

    #[test]
    fn publish_skips_while_reader_holds_the_lock() {
        let publisher = SnapshotPublisher::new(1, 8, 4);
        let guard = publisher.state.lock().unwrap();
        let staged = vec![SpectrumBundle::new(8)];
        assert!(!publisher.publish_spectra(&staged));
        assert!(!publisher.publish_waveform(&[[0.0f32; 4]], 0, 4));
        drop(guard);
        assert!(publisher.publish_spectra(&staged));
    }
}
