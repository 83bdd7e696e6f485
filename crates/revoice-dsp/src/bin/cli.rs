//! CLI tool for auditioning the shifter offline.
//!
//! Usage: revoice-cli <input.wav> <output.wav> [preset.json]
//!
//! Reads WAV, streams it through the engine in fixed-size blocks, writes the
//! processed WAV. If no preset is given, uses default params.

use revoice_dsp::{RevoiceEngine, RevoiceParams, StftConfig};
use std::env;
use std::fs;

/// Host-style block size used for offline streaming.
const BLOCK: usize = 512;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: revoice-cli <input.wav> <output.wav> [preset.json]");
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = &args[2];
    let preset_path = args.get(3);

    // Load params
    let params = if let Some(path) = preset_path {
        let json = fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Failed to read preset {}: {}", path, e);
            std::process::exit(1);
        });
        RevoiceParams::from_json_with_defaults(&json)
    } else {
        RevoiceParams::default()
    };

    // Read input WAV
    let reader = hound::WavReader::open(input_path).unwrap_or_else(|e| {
        eprintln!("Failed to open {}: {}", input_path, e);
        std::process::exit(1);
    });

    let spec = reader.spec();
    let channels = spec.channels as usize;
    let sample_rate = spec.sample_rate;
    let bits = spec.bits_per_sample;

    if channels == 0 || channels > 2 {
        eprintln!("Unsupported channel count: {}", channels);
        std::process::exit(1);
    }

    eprintln!(
        "Input: {} ch, {} Hz, {}-bit, {} samples/ch",
        channels,
        sample_rate,
        bits,
        reader.len() as usize / channels
    );

    // Read samples as f32
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1_i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.unwrap() as f32 / max_val)
                .collect()
        }
        hound::SampleFormat::Float => reader.into_samples::<f32>().map(|s| s.unwrap()).collect(),
    };

    let n_samples = samples.len() / channels;

    // Deinterleave
    let mut planar: Vec<Vec<f32>> = vec![vec![0.0; n_samples]; channels];
    for i in 0..n_samples {
        for ch in 0..channels {
            planar[ch][i] = samples[i * channels + ch];
        }
    }

    let config = StftConfig {
        fft_size: params.fft_size,
        overlap: params.overlap,
        channels,
        max_block: BLOCK,
    };
    let mut engine = RevoiceEngine::new(config).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    eprintln!(
        "Processing: fft {}, overlap {}, pitch {:+}%, formant {:+}%, latency {} samples",
        config.fft_size,
        config.overlap,
        params.pitch,
        params.formant,
        engine.latency_samples()
    );

    // Stream through the engine block by block, in place.
    let mut start = 0;
    while start < n_samples {
        let len = BLOCK.min(n_samples - start);
        let mut block: Vec<&mut [f32]> = planar
            .iter_mut()
            .map(|ch| &mut ch[start..start + len])
            .collect();
        engine.process_block(&mut block, &params);
        start += len;
    }

    // Write output WAV (same layout as input but always 32-bit float)
    let out_spec = hound::WavSpec {
        channels: channels as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(output_path, out_spec).unwrap_or_else(|e| {
        eprintln!("Failed to create {}: {}", output_path, e);
        std::process::exit(1);
    });

    for i in 0..n_samples {
        for ch in 0..channels {
            writer.write_sample(planar[ch][i]).unwrap();
        }
    }
    writer.finalize().unwrap();

    eprintln!("Written {} ({} samples/ch)", output_path, n_samples);
}
