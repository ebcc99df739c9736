//! # Transcription Upload Handler
//!
//! The one pipeline this service exists for: accept a multipart audio upload,
//! stage it in a scratch file, forward it to the speech-recognition backend,
//! and answer with the flattened transcript.
//!
//! ## Endpoint: `POST /transcribe`
//!
//! ## Request:
//! Multipart form data containing one file part. The field name is ignored;
//! the first part carrying a filename is the upload. Later file parts are
//! ignored, and a body with no file part is rejected with 400.
//!
//! ## Response:
//! ```json
//! {
//!   "transcript": "hello\nworld"
//! }
//! ```
//!
//! One line per recognition segment (top-ranked alternative of each), in
//! order. Zero segments yield an empty transcript.
//!
//! ## Failure modes:
//! - no file part → 400 `missing_upload`
//! - upload exceeds the configured size limit → 400 `validation_error`
//! - scratch-file I/O error → 500 `upload_failed`
//! - recognition service error → 502 `recognition_failed`
//!
//! The scratch file is removed on every one of these paths as well as on
//! success; cleanup is tied to a drop guard, not to the happy path.

use crate::error::AppError;
use crate::middleware::logging::RequestId;
use crate::recognition::join_transcript;
use crate::state::AppState;
use crate::upload::{self, sanitize_filename, ScratchFile};
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Success response body: the transcript and nothing else.
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcript: String,
}

/// Route configuration for the transcribe resource.
///
/// Non-POST methods get an empty 405 from the default service before any
/// body processing happens, so no scratch file is ever created for them.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/transcribe")
            .route(web::post().to(transcribe_upload))
            .default_service(web::route().to(method_not_allowed)),
    );
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().finish()
}

/// Handle one transcription upload end to end.
pub async fn transcribe_upload(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    // Request id issued by the logging middleware; ties the scratch-file
    // log lines to the surrounding request logs.
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0)
        .unwrap_or_else(Uuid::new_v4);

    state.increment_active_uploads();
    let result = process_upload(&state, request_id, payload).await;
    state.decrement_active_uploads();
    result
}

/// The sequential pipeline: locate the file part, stage it, recognize it,
/// flatten the transcript.
async fn process_upload(
    state: &web::Data<AppState>,
    request_id: Uuid,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    let (field, client_filename) = first_file_part(&mut payload).await?;

    // Unique scratch path per request; the guard removes the file when this
    // function returns, whatever the outcome.
    let scratch = ScratchFile::new(&config.upload.scratch_path());
    let bytes_written =
        upload::store_stream(field, scratch.path(), config.upload.max_upload_bytes).await?;

    info!(
        request_id = %request_id,
        filename = %client_filename,
        bytes = bytes_written,
        scratch = %scratch.path().display(),
        "Upload staged"
    );

    // The recognition API takes the whole payload in one request, so the
    // scratch file is read back fully before the call.
    let audio = tokio::fs::read(scratch.path()).await?;
    let result = state
        .recognizer()
        .recognize(&config.recognition, &audio)
        .await?;
    let transcript = join_transcript(&result);

    info!(
        request_id = %request_id,
        filename = %client_filename,
        segments = result.results.len(),
        transcript_len = transcript.len(),
        "Transcription complete"
    );

    Ok(HttpResponse::Ok().json(TranscribeResponse { transcript }))
}

/// Advance the multipart stream to the first part that carries a filename.
///
/// Parts without a filename (plain form fields) are skipped. Returns the
/// field together with the sanitized client filename (log metadata only).
async fn first_file_part(payload: &mut Multipart) -> Result<(Field, String), AppError> {
    while let Some(item) = payload.next().await {
        let field =
            item.map_err(|e| AppError::BadRequest(format!("multipart error: {}", e)))?;

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(sanitize_filename);

        if let Some(name) = filename {
            return Ok((field, name));
        }
    }

    Err(AppError::MissingUpload(
        "no file part in request".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, RecognitionConfig};
    use crate::recognition::{
        RecognitionResult, RecognitionSegment, SegmentAlternative, SpeechRecognizer,
    };
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use uuid::Uuid;

    /// Recognizer stub returning one single-alternative segment per entry.
    struct FixedRecognizer {
        segments: Vec<&'static str>,
    }

    #[async_trait]
    impl SpeechRecognizer for FixedRecognizer {
        async fn recognize(
            &self,
            _config: &RecognitionConfig,
            _audio: &[u8],
        ) -> Result<RecognitionResult, AppError> {
            Ok(RecognitionResult {
                results: self
                    .segments
                    .iter()
                    .map(|text| RecognitionSegment {
                        alternatives: vec![SegmentAlternative {
                            transcript: text.to_string(),
                            confidence: Some(0.9),
                        }],
                    })
                    .collect(),
            })
        }
    }

    /// Recognizer stub that always fails like an unreachable upstream.
    struct FailingRecognizer;

    #[async_trait]
    impl SpeechRecognizer for FailingRecognizer {
        async fn recognize(
            &self,
            _config: &RecognitionConfig,
            _audio: &[u8],
        ) -> Result<RecognitionResult, AppError> {
            Err(AppError::RecognitionFailed(
                "service unavailable".to_string(),
            ))
        }
    }

    /// AppState wired to a fresh scratch dir so each test can assert that
    /// no scratch files are left behind.
    fn test_state(recognizer: Arc<dyn SpeechRecognizer>) -> (AppState, PathBuf) {
        let scratch_dir = std::env::temp_dir().join(format!("att-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&scratch_dir).unwrap();

        let mut config = AppConfig::default();
        config.upload.scratch_dir = scratch_dir.to_string_lossy().into_owned();

        (AppState::new(config, recognizer), scratch_dir)
    }

    fn assert_scratch_empty(dir: &Path) {
        let leftovers: Vec<_> = std::fs::read_dir(dir).unwrap().collect();
        assert!(leftovers.is_empty(), "scratch files left behind: {:?}", leftovers);
    }

    const BOUNDARY: &str = "test-boundary-4fb2a9";

    fn content_type() -> (&'static str, String) {
        (
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
    }

    fn file_part(filename: &str, content: &[u8]) -> Vec<u8> {
        let mut part = Vec::new();
        part.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        part.extend_from_slice(content);
        part.extend_from_slice(b"\r\n");
        part
    }

    fn text_part(name: &str, value: &str) -> Vec<u8> {
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        )
        .into_bytes()
    }

    fn close_body(mut parts: Vec<u8>) -> Vec<u8> {
        parts.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        parts
    }

    macro_rules! init_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_upload_returns_joined_transcript() {
        let (state, scratch_dir) = test_state(Arc::new(FixedRecognizer {
            segments: vec!["hello", "world"],
        }));
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/transcribe")
            .insert_header(content_type())
            .set_payload(close_body(file_part("clip.wav", b"fake-pcm-audio")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "transcript": "hello\nworld" }));
        assert_scratch_empty(&scratch_dir);
    }

    #[actix_web::test]
    async fn test_zero_segments_yield_empty_transcript() {
        let (state, scratch_dir) = test_state(Arc::new(FixedRecognizer { segments: vec![] }));
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/transcribe")
            .insert_header(content_type())
            .set_payload(close_body(file_part("silence.wav", b"\0\0\0\0")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "transcript": "" }));
        assert_scratch_empty(&scratch_dir);
    }

    #[actix_web::test]
    async fn test_first_file_part_wins() {
        let (state, scratch_dir) = test_state(Arc::new(FixedRecognizer {
            segments: vec!["first"],
        }));
        let app = init_app!(state);

        // A text field before the file must be skipped; a second file after
        // it must be ignored.
        let mut parts = text_part("note", "not audio");
        parts.extend(file_part("one.wav", b"audio-1"));
        parts.extend(file_part("two.wav", b"audio-2"));

        let req = test::TestRequest::post()
            .uri("/transcribe")
            .insert_header(content_type())
            .set_payload(close_body(parts))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "transcript": "first" }));
        assert_scratch_empty(&scratch_dir);
    }

    #[actix_web::test]
    async fn test_missing_file_part_is_bad_request() {
        let (state, scratch_dir) = test_state(Arc::new(FixedRecognizer { segments: vec![] }));
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/transcribe")
            .insert_header(content_type())
            .set_payload(close_body(text_part("note", "just text")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "missing_upload");
        assert_scratch_empty(&scratch_dir);
    }

    #[actix_web::test]
    async fn test_non_post_method_is_rejected_with_empty_body() {
        let (state, scratch_dir) = test_state(Arc::new(FixedRecognizer { segments: vec![] }));
        let app = init_app!(state);

        let req = test::TestRequest::get().uri("/transcribe").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = test::read_body(resp).await;
        assert!(body.is_empty());
        assert_scratch_empty(&scratch_dir);
    }

    #[actix_web::test]
    async fn test_recognition_failure_surfaces_as_bad_gateway() {
        let (state, scratch_dir) = test_state(Arc::new(FailingRecognizer));
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/transcribe")
            .insert_header(content_type())
            .set_payload(close_body(file_part("clip.wav", b"fake-pcm-audio")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "recognition_failed");
        // The scratch file must be cleaned up on the failure path too.
        assert_scratch_empty(&scratch_dir);
    }

    #[actix_web::test]
    async fn test_oversized_upload_is_rejected_and_cleaned_up() {
        let (state, scratch_dir) = test_state(Arc::new(FixedRecognizer { segments: vec![] }));
        let mut config = state.get_config();
        config.upload.max_upload_bytes = 8;
        state.update_config(config).unwrap();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/transcribe")
            .insert_header(content_type())
            .set_payload(close_body(file_part("big.wav", &[0u8; 64])))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "validation_error");
        assert_scratch_empty(&scratch_dir);
    }
}
