//! Revoice — real-time pitch and formant shifter, nih-plug VST3/CLAP/
//! standalone plugin.
//!
//! Wraps the revoice-dsp streaming engine. The engine decouples the host
//! block size from the analysis frame internally, so `process` is a single
//! in-place call; the plugin's own work is parameter plumbing, layout
//! handling, and reconfiguration when a structural parameter changes.

mod params;

use std::sync::Arc;

use nih_plug::prelude::*;
use revoice_dsp::{RevoiceEngine, SnapshotPublisher, SpectrumBundle, StftConfig};

pub use params::{FftSizeOption, OverlapOption, RevoicePluginParams};

pub struct RevoicePlugin {
    params: Arc<RevoicePluginParams>,
    engine: Option<RevoiceEngine>,
    /// Channel count the engine processes (the main input count).
    channels: usize,
    max_block: usize,
}

impl Default for RevoicePlugin {
    fn default() -> Self {
        Self {
            params: Arc::new(RevoicePluginParams::default()),
            engine: None,
            channels: 0,
            max_block: 0,
        }
    }
}

impl RevoicePlugin {
    fn desired_config(&self) -> StftConfig {
        StftConfig {
            fft_size: self.params.fft_size.value().samples(),
            overlap: self.params.overlap.value().count(),
            channels: self.channels,
            max_block: self.max_block,
        }
    }

    /// Snapshot access for observer views (oscilloscope / spectrum display).
    pub fn publisher(&self) -> Option<Arc<SnapshotPublisher>> {
        self.engine.as_ref().map(|e| e.publisher().clone())
    }

    /// Copy the most recent post-mix output samples into `dest`.
    pub fn buffer_data_for_ui(&self, dest: &mut Vec<Vec<f32>>) {
        if let Some(engine) = &self.engine {
            engine.publisher().read_waveform(dest);
        }
    }

    /// Copy the latest per-channel spectral bundles into `dest`.
    pub fn spectrum_data_for_ui(&self, dest: &mut Vec<SpectrumBundle>) {
        if let Some(engine) = &self.engine {
            engine.publisher().read_spectra(dest);
        }
    }
}

impl Plugin for RevoicePlugin {
    const NAME: &'static str = "Revoice";
    const VENDOR: &'static str = "revoice-project";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            ..AudioIOLayout::const_default()
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            ..AudioIOLayout::const_default()
        },
        // Mono sources fan out to both outputs after the wet mix.
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(2),
            ..AudioIOLayout::const_default()
        },
    ];

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        layout: &AudioIOLayout,
        config: &BufferConfig,
        context: &mut impl InitContext<Self>,
    ) -> bool {
        self.channels = layout
            .main_input_channels
            .map(NonZeroU32::get)
            .unwrap_or(1) as usize;
        self.max_block = config.max_buffer_size.max(1) as usize;

        match RevoiceEngine::new(self.desired_config()) {
            Ok(engine) => {
                context.set_latency_samples(engine.latency_samples() as u32);
                self.engine = Some(engine);
                true
            }
            Err(err) => {
                nih_error!("engine configuration rejected: {err}");
                false
            }
        }
    }

    fn reset(&mut self) {
        if let Some(engine) = &mut self.engine {
            engine.reset();
        }
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let desired = self.desired_config();
        let Some(engine) = &mut self.engine else {
            return ProcessStatus::Normal;
        };

        // Structural parameter changes apply at block boundaries, before any
        // sample of this block is consumed.
        if *engine.config() != desired {
            match engine.reconfigure(desired) {
                Ok(()) => context.set_latency_samples(engine.latency_samples() as u32),
                Err(err) => nih_error!("keeping previous configuration: {err}"),
            }
        }

        let dsp_params = self.params.to_dsp_params();
        let channels = self.channels;
        let output = buffer.as_slice();

        engine.process_block(&mut output[..channels], &dsp_params);

        // Mono input with a wider output: duplicate the processed channel.
        if output.len() > channels {
            let (processed, rest) = output.split_at_mut(channels);
            let source = &processed[0];
            for extra in rest.iter_mut() {
                extra.copy_from_slice(source);
            }
        }

        ProcessStatus::Normal
    }
}

impl ClapPlugin for RevoicePlugin {
    const CLAP_ID: &'static str = "com.revoice-project.revoice";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Independent pitch and formant shifting");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::PitchShifter,
    ];
}

impl Vst3Plugin for RevoicePlugin {
    const VST3_CLASS_ID: [u8; 16] = *b"RevoicePitchFmt!";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::PitchShift];
}

nih_export_clap!(RevoicePlugin);
nih_export_vst3!(RevoicePlugin);
