//! HTTP surface of the TTS service.
//!
//! | Method | Path      | Body                                   | Response                 |
//! |--------|-----------|----------------------------------------|--------------------------|
//! | GET    | `/`       | —                                      | `{"engine", "version"}`  |
//! | GET    | `/health` | —                                      | `{"status": "ok"}`       |
//! | POST   | `/tts`    | form: `text`, optional `compress=bool` | `audio/flac` / `audio/wav` |
//!
//! `compress` defaults to `true`.  Synthesis is blocking and runs on the
//! tokio blocking pool.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    audio::AudioFormat,
    engine::{EngineError, SamplerConfig, SpeechEngine, SynthesisRequest},
    error::{Error, Result},
    language::{LanguageCode, LanguageDetector},
    normalize::TextNormalizer,
};

pub const MISSING_TEXT: &str = "Text to convert into speech must be provided.";
pub const NOTHING_TO_SPEAK: &str = "Text contains nothing to speak after cleaning.";

const LANGUAGE_HEADER: &str = "x-language-detected";

/// Per-process service settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub speaker: String,
    pub sampler: SamplerConfig,
    pub default_language: LanguageCode,
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            speaker: "bria".to_string(),
            sampler: SamplerConfig::default(),
            default_language: LanguageCode::English,
            cors_origins: vec!["*".to_string()],
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Encoded speech for one request.
#[derive(Debug)]
pub struct SpeechOutput {
    pub language: LanguageCode,
    pub format: AudioFormat,
    pub audio: Vec<u8>,
}

/// Shared, immutable service state.
pub struct AppState {
    engine: Arc<dyn SpeechEngine>,
    detector: LanguageDetector,
    normalizer: TextNormalizer,
    settings: ServiceSettings,
}

impl AppState {
    pub fn new(engine: Arc<dyn SpeechEngine>, settings: ServiceSettings) -> Self {
        Self {
            engine,
            detector: LanguageDetector::new(),
            normalizer: TextNormalizer::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Detect → normalise → synthesise → encode.  Blocking.
    pub fn render(&self, text: &str, format: AudioFormat) -> Result<SpeechOutput> {
        let language = self.detector.detect_or(text, self.settings.default_language);
        let cleaned = self.normalizer.process(text);
        if cleaned.is_empty() {
            return Err(Error::InvalidRequest(NOTHING_TO_SPEAK.to_string()));
        }

        let request = SynthesisRequest {
            text: cleaned,
            language: language.as_str().to_string(),
            speaker: self.settings.speaker.clone(),
            sampler: self.settings.sampler,
        };
        let synthesis = self.engine.synthesize(&request)?;
        let audio = format.encode(&synthesis)?;

        tracing::info!(
            language = %language,
            format = format.extension(),
            input_chars = text.chars().count(),
            spoken_chars = request.text.chars().count(),
            seconds = synthesis.duration_secs(),
            bytes = audio.len(),
            "Synthesised speech"
        );
        Ok(SpeechOutput { language, format, audio })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors → HTTP
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidRequest(_) | Error::Engine(EngineError::EmptyText) => {
                StatusCode::BAD_REQUEST
            }
            Error::Engine(_) => StatusCode::BAD_GATEWAY,
            Error::Audio(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(ErrorResponse { detail: self.to_string() })).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TtsForm {
    pub text: Option<String>,
    pub compress: Option<String>,
}

/// Lenient boolean form value: true/false, 1/0, yes/no, on/off.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}

async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "engine": state.engine.name(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn tts(State(state): State<Arc<AppState>>, Form(form): Form<TtsForm>) -> Result<Response> {
    let text = form
        .text
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::InvalidRequest(MISSING_TEXT.to_string()))?;

    let compress = match form.compress.as_deref() {
        None => true,
        Some(raw) => parse_flag(raw).ok_or_else(|| {
            Error::InvalidRequest(format!("Invalid compress value {:?}; expected a boolean.", raw))
        })?,
    };
    let format = if compress { AudioFormat::Flac } else { AudioFormat::Wav };

    let worker = Arc::clone(&state);
    let output = tokio::task::spawn_blocking(move || worker.render(&text, format))
        .await
        .map_err(|e| Error::Internal(format!("synthesis task failed: {e}")))??;

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(output.format.mime_type())),
        (HeaderName::from_static(LANGUAGE_HEADER), HeaderValue::from_static(output.language.as_str())),
    ];
    Ok((StatusCode::OK, headers, output.audio).into_response())
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// `*` anywhere in the list allows every origin without credentials;
/// otherwise only the listed origins, with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed)).allow_credentials(true)
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);
    let body_limit = state.settings.max_body_bytes;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/tts", post(tts))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    tracing::info!(
        addr = %listener.local_addr()?,
        engine = state.engine.name(),
        "TTS service listening"
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::audio::Synthesis;

    #[derive(Default)]
    struct FakeEngine {
        calls: Mutex<Vec<SynthesisRequest>>,
    }

    impl SpeechEngine for FakeEngine {
        fn name(&self) -> &str {
            "fake"
        }

        fn synthesize(&self, request: &SynthesisRequest) -> Result<Synthesis, EngineError> {
            self.calls.lock().unwrap().push(request.clone());
            let samples = (0..4_800).map(|i| ((i % 48) as f32 / 48.0) - 0.5).collect();
            Ok(Synthesis::new(samples, 24_000))
        }
    }

    struct DownEngine;

    impl SpeechEngine for DownEngine {
        fn name(&self) -> &str {
            "down"
        }

        fn synthesize(&self, _: &SynthesisRequest) -> Result<Synthesis, EngineError> {
            Err(EngineError::Status { status: 503, body: "model loading".to_string() })
        }
    }

    fn app_with(engine: Arc<dyn SpeechEngine>) -> Router {
        router(Arc::new(AppState::new(engine, ServiceSettings::default())))
    }

    fn post_tts(pairs: &[(&str, &str)]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/tts")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(serde_urlencoded::to_string(pairs).unwrap()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const ENGLISH: &str = "The **closest** point is about 465 million miles away, roughly 50% of the way 🚀.";

    #[tokio::test]
    async fn test_health() {
        let response = app_with(Arc::new(FakeEngine::default()))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_root_reports_engine() {
        let response = app_with(Arc::new(FakeEngine::default()))
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["engine"], "fake");
    }

    #[tokio::test]
    async fn test_missing_text_is_bad_request() {
        for pairs in [&[][..], &[("text", "")][..], &[("compress", "false")][..]] {
            let response = app_with(Arc::new(FakeEngine::default()))
                .oneshot(post_tts(pairs))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["detail"], MISSING_TEXT);
        }
    }

    #[tokio::test]
    async fn test_invalid_compress_flag() {
        let response = app_with(Arc::new(FakeEngine::default()))
            .oneshot(post_tts(&[("text", ENGLISH), ("compress", "maybe")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wav_response_and_cleaned_text() {
        let engine = Arc::new(FakeEngine::default());
        let response = app_with(engine.clone())
            .oneshot(post_tts(&[("text", ENGLISH), ("compress", "false")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
        assert_eq!(response.headers()[LANGUAGE_HEADER], "en");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..4], b"RIFF");

        let calls = engine.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].text,
            "The closest point is about 465 million miles away, roughly 50 percent of the way ."
        );
        assert_eq!(calls[0].language, "en");
        assert_eq!(calls[0].speaker, "bria");
    }

    #[tokio::test]
    async fn test_form_text_is_url_decoded() {
        let engine = Arc::new(FakeEngine::default());
        let response = app_with(engine.clone())
            .oneshot(post_tts(&[("text", "Fish & chips: 2*3 = 6 ☕"), ("compress", "no")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let calls = engine.calls.lock().unwrap();
        assert_eq!(calls[0].text, "Fish & chips: 2 times 3 = 6");
    }

    #[tokio::test]
    async fn test_flac_is_default() {
        let response = app_with(Arc::new(FakeEngine::default()))
            .oneshot(post_tts(&[("text", ENGLISH)]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/flac");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..4], b"fLaC");
    }

    #[tokio::test]
    async fn test_text_with_nothing_to_speak() {
        let engine = Arc::new(FakeEngine::default());
        let response = app_with(engine.clone())
            .oneshot(post_tts(&[("text", "🎉🎉\n\n  ")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["detail"], NOTHING_TO_SPEAK);
        assert!(engine.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engine_failure_is_bad_gateway() {
        let response = app_with(Arc::new(DownEngine))
            .oneshot(post_tts(&[("text", ENGLISH)]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let detail = body_json(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("503"), "got: {}", detail);
    }

    #[tokio::test]
    async fn test_cors_wildcard() {
        let response = app_with(Arc::new(FakeEngine::default()))
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_cors_explicit_origins() {
        let settings = ServiceSettings {
            cors_origins: vec!["http://localhost:3000".to_string()],
            ..ServiceSettings::default()
        };
        let app = router(Arc::new(AppState::new(Arc::new(FakeEngine::default()), settings)));
        let response = app
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag(""), None);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::InvalidRequest(String::new()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::Engine(EngineError::EmptyText).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::Engine(EngineError::Transport("refused".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
