use crate::audio::AudioError;
use crate::engine::EngineError;

/// Errors surfaced by the speech pipeline.
///
/// Text normalisation never fails; everything here comes from request
/// validation or from the collaborators around it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("speech engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("audio encoding error: {0}")]
    Audio(#[from] AudioError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
