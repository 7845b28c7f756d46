//! WAV decoding and encoding using hound
//!
//! Decoding accepts integer and float PCM at any bit depth and mixes every
//! channel down to mono. Encoding writes mono 16-bit, 24-bit or 32-bit float.

use crate::buffer::AudioBuffer;
use crate::error::{Error, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, Write};
use std::path::Path;
use tracing::debug;

/// Bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitDepth {
    Int16,
    Int24,
    #[default]
    Float32,
}

impl BitDepth {
    /// Bits per sample.
    pub fn bits(&self) -> u16 {
        match self {
            BitDepth::Int16 => 16,
            BitDepth::Int24 => 24,
            BitDepth::Float32 => 32,
        }
    }
}

/// WAV encoder configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WavConfig {
    pub bit_depth: BitDepth,
}

impl WavConfig {
    pub fn new(bit_depth: BitDepth) -> Self {
        Self { bit_depth }
    }
}

/// Decode a WAV file into a mono buffer.
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path)?;
    let buffer = decode(reader)?;
    debug!(
        "Decoded {}: {} samples at {} Hz ({:.3}s)",
        path.display(),
        buffer.len(),
        buffer.sample_rate(),
        buffer.duration()
    );
    Ok(buffer)
}

/// Decode WAV bytes into a mono buffer.
pub fn decode_wav_memory(bytes: &[u8]) -> Result<AudioBuffer> {
    decode(WavReader::new(std::io::Cursor::new(bytes))?)
}

fn decode<R: Read>(mut reader: WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(Error::InvalidData("WAV file declares zero channels".into()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    AudioBuffer::new(mixdown(&interleaved, channels), spec.sample_rate)
}

/// Average interleaved frames into one channel.
fn mixdown(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    let gain = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * gain)
        .collect()
}

/// Encode a mono buffer to a WAV file.
pub fn write_wav(buffer: &AudioBuffer, path: &Path, config: &WavConfig) -> Result<()> {
    let mut writer = WavWriter::create(path, create_wav_spec(buffer.sample_rate(), config))?;
    write_mono_samples(&mut writer, buffer.samples(), config)?;
    writer.finalize()?;

    debug!(
        "Wrote {}: {} samples, {}-bit",
        path.display(),
        buffer.len(),
        config.bit_depth.bits()
    );
    Ok(())
}

/// Encode a mono buffer to WAV in memory.
pub fn encode_wav_memory(buffer: &AudioBuffer, config: &WavConfig) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut bytes);
        let mut writer = WavWriter::new(cursor, create_wav_spec(buffer.sample_rate(), config))?;
        write_mono_samples(&mut writer, buffer.samples(), config)?;
        writer.finalize()?;
    }
    Ok(bytes)
}

/// Create hound WavSpec from our config
fn create_wav_spec(sample_rate: u32, config: &WavConfig) -> WavSpec {
    let sample_format = match config.bit_depth {
        BitDepth::Float32 => SampleFormat::Float,
        _ => SampleFormat::Int,
    };

    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: config.bit_depth.bits(),
        sample_format,
    }
}

fn write_mono_samples<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    samples: &[f32],
    config: &WavConfig,
) -> Result<()> {
    match config.bit_depth {
        BitDepth::Int16 => {
            for &sample in samples {
                writer.write_sample(float_to_i16(sample))?;
            }
        }
        BitDepth::Int24 => {
            for &sample in samples {
                writer.write_sample(float_to_i24(sample))?;
            }
        }
        BitDepth::Float32 => {
            for &sample in samples {
                writer.write_sample(sample)?;
            }
        }
    }
    Ok(())
}

/// Convert float sample to 16-bit integer with clipping
#[inline]
fn float_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * 32767.0) as i16
}

/// Convert float sample to 24-bit integer (stored as i32) with clipping
#[inline]
fn float_to_i24(sample: f32) -> i32 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * 8388607.0) as i32
}
