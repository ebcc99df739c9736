//! HTTP client for the Google-style speech recognition REST API.
//!
//! Issues one non-streaming `speech:recognize` call per upload: the audio
//! bytes are base64-encoded into the JSON body together with the configured
//! encoding, sample rate and language. No retry and no timeout override;
//! the call either succeeds or surfaces as a 502 to the caller.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use tracing::debug;

use crate::config::RecognitionConfig;
use crate::error::AppError;
use crate::recognition::{RecognitionResult, SpeechRecognizer};

/// Audio configuration block of a `speech:recognize` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestConfig<'a> {
    encoding: &'a str,
    sample_rate_hertz: u32,
    language_code: &'a str,
}

/// Audio payload block: the uploaded file content, base64-encoded.
#[derive(Debug, Serialize)]
struct RequestAudio {
    content: String,
}

/// Complete JSON body of a `speech:recognize` request.
#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    config: RequestConfig<'a>,
    audio: RequestAudio,
}

impl<'a> RecognizeRequest<'a> {
    fn new(config: &'a RecognitionConfig, audio: &[u8]) -> Self {
        Self {
            config: RequestConfig {
                encoding: &config.encoding,
                sample_rate_hertz: config.sample_rate_hertz,
                language_code: &config.language_code,
            },
            audio: RequestAudio {
                content: BASE64.encode(audio),
            },
        }
    }
}

/// Client for the external recognition service.
pub struct GoogleSpeechClient {
    http: reqwest::Client,
}

impl GoogleSpeechClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    fn recognize_url(config: &RecognitionConfig) -> String {
        let mut url = format!(
            "{}/v1/speech:recognize",
            config.endpoint.trim_end_matches('/')
        );
        if let Some(key) = &config.api_key {
            url.push_str("?key=");
            url.push_str(key);
        }
        url
    }
}

impl Default for GoogleSpeechClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechRecognizer for GoogleSpeechClient {
    async fn recognize(
        &self,
        config: &RecognitionConfig,
        audio: &[u8],
    ) -> Result<RecognitionResult, AppError> {
        let body = RecognizeRequest::new(config, audio);
        let url = Self::recognize_url(config);

        debug!(
            audio_bytes = audio.len(),
            encoding = %config.encoding,
            sample_rate_hertz = config.sample_rate_hertz,
            language_code = %config.language_code,
            "Sending recognition request"
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::RecognitionFailed(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::RecognitionFailed(format!(
                "recognition API returned HTTP {}: {}",
                status, detail
            )));
        }

        response
            .json::<RecognitionResult>()
            .await
            .map_err(|e| AppError::RecognitionFailed(format!("invalid response body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    /// The request body must carry the fixed audio config in the wire-format
    /// field names, plus the base64 payload.
    #[test]
    fn test_recognize_request_body() {
        let config = AppConfig::default().recognition;
        let request = RecognizeRequest::new(&config, b"audio-bytes");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["config"]["encoding"], "LINEAR16");
        assert_eq!(json["config"]["sampleRateHertz"], 41000);
        assert_eq!(json["config"]["languageCode"], "en-US");
        assert_eq!(json["audio"]["content"], BASE64.encode(b"audio-bytes"));
    }

    #[test]
    fn test_recognize_url_without_key() {
        let config = AppConfig::default().recognition;
        assert_eq!(
            GoogleSpeechClient::recognize_url(&config),
            "https://speech.googleapis.com/v1/speech:recognize"
        );
    }

    #[test]
    fn test_recognize_url_appends_key_and_trims_slash() {
        let mut config = AppConfig::default().recognition;
        config.endpoint = "http://localhost:9090/".to_string();
        config.api_key = Some("secret".to_string());
        assert_eq!(
            GoogleSpeechClient::recognize_url(&config),
            "http://localhost:9090/v1/speech:recognize?key=secret"
        );
    }
}
