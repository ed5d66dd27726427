//! # bria-tts
//!
//! Text cleaning and HTTP plumbing for a speech-generation model.
//!
//! ## Quick start
//!
//! ```
//! use bria_tts::normalize;
//!
//! assert_eq!(normalize("**Hot** today: 40°C"), "Hot today: 40° Celsius");
//! assert_eq!(normalize("3*4=12"), "3 times 4=12");
//! ```
//!
//! ## Pipeline
//! 1. **Language detection** — `lingua`, falling back to English (`detect`).
//! 2. **Normalisation** — blank lines, emoji and markdown emphasis removed;
//!    `%`, `*` and temperature units spelled out (see [`normalize`]).
//! 3. **Synthesis** — delegated to a [`SpeechEngine`]; the bundled
//!    [`engine::RemoteEngine`] calls a generation sidecar (`remote`).
//! 4. **Encoding** — 16-bit WAV, or FLAC with the `flac` feature.
//!
//! The `server` feature adds the axum service (`POST /tts`, `GET /health`,
//! `GET /`) and the `bria-tts-server` binary.

pub mod audio;
pub mod engine;
pub mod error;
pub mod language;
pub mod normalize;

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod server;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use audio::{AudioFormat, Synthesis};
pub use engine::{SamplerConfig, SpeechEngine, SynthesisRequest};
pub use error::{Error, Result};
pub use language::LanguageCode;
pub use normalize::{normalize, NormalizationStep, NormalizerConfig, TextNormalizer};
