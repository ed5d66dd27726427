//! In-memory audio encoding for synthesised speech.
//!
//! The engine hands back mono `f32` samples; the service returns either a
//! 16-bit PCM WAV or, with the `flac` feature, a lossless FLAC stream of the
//! same samples.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("FLAC error: {0}")]
    Flac(String),

    #[error("{0} output is not enabled in this build")]
    Unsupported(&'static str),
}

/// Mono audio produced by a speech engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Synthesis {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Container returned to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Flac,
}

impl AudioFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }

    pub fn encode(self, synthesis: &Synthesis) -> Result<Vec<u8>, AudioError> {
        match self {
            AudioFormat::Wav => encode_wav(synthesis),
            #[cfg(feature = "flac")]
            AudioFormat::Flac => encode_flac(synthesis),
            #[cfg(not(feature = "flac"))]
            AudioFormat::Flac => Err(AudioError::Unsupported("FLAC")),
        }
    }
}

// Convert f32 [-1.0, 1.0] → i16 [-32768, 32767].
fn to_i16(s: f32) -> i16 {
    (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Encode samples as a 16-bit PCM mono WAV.
pub fn encode_wav(synthesis: &Synthesis) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: synthesis.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &s in &synthesis.samples {
            writer.write_sample(to_i16(s))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Decode a WAV (integer or float PCM) into mono samples.
///
/// Multi-channel input is downmixed by averaging each frame.
pub fn decode_wav(bytes: &[u8]) -> Result<Synthesis, AudioError> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok(Synthesis::new(samples, spec.sample_rate))
}

/// Encode samples as a 16-bit mono FLAC stream.
#[cfg(feature = "flac")]
pub fn encode_flac(synthesis: &Synthesis) -> Result<Vec<u8>, AudioError> {
    use flacenc::component::BitRepr;
    use flacenc::error::Verify;

    let samples: Vec<i32> = synthesis.samples.iter().map(|&s| i32::from(to_i16(s))).collect();

    let config = flacenc::config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| AudioError::Flac(format!("invalid encoder config: {e:?}")))?;
    let source = flacenc::source::MemSource::from_samples(
        &samples,
        1,
        16,
        synthesis.sample_rate as usize,
    );
    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| AudioError::Flac(format!("encode failed: {e:?}")))?;

    let mut sink = flacenc::bitsink::ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|_| AudioError::Flac("failed to serialise stream".to_string()))?;
    Ok(sink.as_slice().to_vec())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
