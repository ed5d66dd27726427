//! Speech engine seam.
//!
//! The synthesis model itself runs outside this crate.  [`SpeechEngine`] is
//! the boundary: it receives already-normalised text plus a language code
//! and returns mono samples.  An engine is built once at startup and shared
//! behind an `Arc` by every request handler.
//!
//! With the `remote` feature, [`RemoteEngine`] talks to a generation sidecar
//! over HTTP:
//!
//! ```text
//! POST {base_url}/generate
//! {"text": "...", "language": "en", "speaker": "bria",
//!  "temperature": 0.8, "min_p": 0.0, "max_batch_size": 32}
//! → 200 audio/wav
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::audio::{AudioError, Synthesis};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("refusing to synthesise empty text")]
    EmptyText,

    #[error("engine request failed: {0}")]
    Transport(String),

    #[error("engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("engine returned unreadable audio: {0}")]
    Decode(#[from] AudioError),
}

/// Sampling parameters forwarded to the generation model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplerConfig {
    pub temperature: f32,
    pub min_p: f32,
    /// Upper bound on chunks generated in one batch.
    pub max_batch_size: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { temperature: 0.8, min_p: 0.0, max_batch_size: 32 }
    }
}

/// One synthesis call.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest {
    pub text: String,
    /// ISO 639-1 code.
    pub language: String,
    /// Speaker profile name known to the engine.
    pub speaker: String,
    #[serde(flatten)]
    pub sampler: SamplerConfig,
}

/// A text-to-speech backend.
///
/// Calls may block for seconds; async callers should run them on a blocking
/// thread.
pub trait SpeechEngine: Send + Sync {
    /// Short identifier reported by the service root endpoint.
    fn name(&self) -> &str;

    fn synthesize(&self, request: &SynthesisRequest) -> Result<Synthesis, EngineError>;
}

#[cfg(feature = "remote")]
pub use remote::RemoteEngine;

#[cfg(feature = "remote")]
mod remote {
    use std::time::Duration;

    use reqwest::blocking::Client;

    use super::{EngineError, SpeechEngine, SynthesisRequest};
    use crate::audio::{decode_wav, Synthesis};

    /// Longest engine error body kept in [`EngineError::Status`].
    const MAX_ERROR_BODY: usize = 512;

    /// Engine backed by an HTTP generation sidecar.
    pub struct RemoteEngine {
        client: Client,
        endpoint: String,
        name: String,
    }

    impl RemoteEngine {
        /// Build a client for the sidecar at `base_url`.
        ///
        /// Must be called outside an async runtime: the blocking client owns
        /// its own.
        pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EngineError> {
            let base = base_url.trim_end_matches('/');
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| EngineError::Transport(e.to_string()))?;
            Ok(Self {
                client,
                endpoint: format!("{}/generate", base),
                name: format!("remote:{}", base),
            })
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    impl SpeechEngine for RemoteEngine {
        fn name(&self) -> &str {
            &self.name
        }

        fn synthesize(&self, request: &SynthesisRequest) -> Result<Synthesis, EngineError> {
            if request.text.trim().is_empty() {
                return Err(EngineError::EmptyText);
            }

            tracing::debug!(
                endpoint = %self.endpoint,
                language = %request.language,
                speaker = %request.speaker,
                text_length = request.text.len(),
                "Calling speech engine"
            );

            let response = self
                .client
                .post(&self.endpoint)
                .json(request)
                .send()
                .map_err(|e| EngineError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let mut body = response.text().unwrap_or_default();
                if body.len() > MAX_ERROR_BODY {
                    let cut = (0..=MAX_ERROR_BODY)
                        .rev()
                        .find(|&i| body.is_char_boundary(i))
                        .unwrap_or(0);
                    body.truncate(cut);
                }
                return Err(EngineError::Status { status: status.as_u16(), body });
            }

            let bytes = response
                .bytes()
                .map_err(|e| EngineError::Transport(e.to_string()))?;
            let synthesis = decode_wav(&bytes)?;

            tracing::info!(
                samples = synthesis.samples.len(),
                sample_rate = synthesis.sample_rate,
                seconds = synthesis.duration_secs(),
                "Speech engine returned audio"
            );
            Ok(synthesis)
        }
    }

}
