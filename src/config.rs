//! Command-line / environment configuration for the TTS service.

use clap::{Parser, ValueEnum};

use crate::engine::SamplerConfig;
use crate::language::LanguageCode;
use crate::server::ServiceSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Text-to-speech HTTP service.
#[derive(Debug, Clone, Parser)]
#[command(name = "bria-tts-server", version, about)]
pub struct Config {
    /// Interface to bind.
    #[arg(long, env = "BRIA_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "BRIA_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Base URL of the speech generation sidecar.
    #[arg(long, env = "BRIA_ENGINE_URL", default_value = "http://localhost:8080")]
    pub engine_url: String,

    /// Per-request timeout for the generation sidecar, in seconds.
    #[arg(long, env = "BRIA_ENGINE_TIMEOUT_SECS", default_value_t = 300)]
    pub engine_timeout_secs: u64,

    /// Speaker profile passed to the engine.
    #[arg(long, env = "BRIA_SPEAKER", default_value = "bria")]
    pub speaker: String,

    #[arg(long, env = "BRIA_TEMPERATURE", default_value_t = 0.8)]
    pub temperature: f32,

    #[arg(long, env = "BRIA_MIN_P", default_value_t = 0.0)]
    pub min_p: f32,

    #[arg(long, env = "BRIA_MAX_BATCH_SIZE", default_value_t = 32)]
    pub max_batch_size: usize,

    /// Language used when detection is inconclusive.
    #[arg(long, env = "BRIA_DEFAULT_LANGUAGE", default_value = "en")]
    pub default_language: LanguageCode,

    /// Allowed CORS origin; repeat or comma-separate.  `*` allows any origin.
    #[arg(
        long = "cors-origin",
        env = "BRIA_CORS_ORIGINS",
        value_delimiter = ',',
        default_values = ["*", "http://localhost:8000", "http://localhost:3000"]
    )]
    pub cors_origins: Vec<String>,

    /// Largest accepted request body.
    #[arg(long, env = "BRIA_MAX_BODY_BYTES", default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,

    #[arg(long, env = "BRIA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn sampler(&self) -> SamplerConfig {
        SamplerConfig {
            temperature: self.temperature,
            min_p: self.min_p,
            max_batch_size: self.max_batch_size,
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            speaker: self.speaker.clone(),
            sampler: self.sampler(),
            default_language: self.default_language,
            cors_origins: self.cors_origins.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::try_parse_from(["bria-tts-server"]).unwrap();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8000");
        assert_eq!(cfg.speaker, "bria");
        assert_eq!(cfg.default_language, LanguageCode::English);
        assert_eq!(cfg.sampler(), SamplerConfig::default());
        assert_eq!(
            cfg.cors_origins,
            vec!["*", "http://localhost:8000", "http://localhost:3000"]
        );
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let cfg = Config::try_parse_from([
            "bria-tts-server",
            "--port",
            "9000",
            "--default-language",
            "fr",
            "--cors-origin",
            "https://a.example,https://b.example",
            "--log-format",
            "json",
            "--temperature",
            "0.5",
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.default_language, LanguageCode::French);
        assert_eq!(cfg.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(cfg.log_format, LogFormat::Json);
        let settings = cfg.service_settings();
        assert_eq!(settings.sampler.temperature, 0.5);
        assert_eq!(settings.default_language, LanguageCode::French);
    }

    #[test]
    fn test_rejects_unknown_language() {
        assert!(Config::try_parse_from(["bria-tts-server", "--default-language", "xx"]).is_err());
    }
}
