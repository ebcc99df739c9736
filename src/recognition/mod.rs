//! Speech-recognition backend abstraction.
//!
//! The HTTP layer depends on the [`SpeechRecognizer`] trait instead of a
//! concrete client, which keeps request handling decoupled from the external
//! API and lets tests inject a fake backend with canned results.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, RecognitionConfig};
use crate::error::AppError;

pub mod google;

/// One ranked transcription candidate for a segment of audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentAlternative {
    /// Transcribed text for this candidate.
    #[serde(default)]
    pub transcript: String,
    /// Confidence score (0.0 - 1.0) if the service reported one.
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// One unit of a recognition result, covering a span of audio and carrying
/// ranked alternative transcriptions (best first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionSegment {
    #[serde(default)]
    pub alternatives: Vec<SegmentAlternative>,
}

/// Full result returned by a recognition backend: an ordered sequence of
/// segments. Mirrors the wire shape of the recognition API
/// (`results[].alternatives[].transcript`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecognitionResult {
    #[serde(default)]
    pub results: Vec<RecognitionSegment>,
}

/// Backend contract implemented by speech-recognition clients.
///
/// `audio` is the raw uploaded file content; encoding/sample-rate/language
/// come from the per-call `RecognitionConfig` so handlers always use the
/// currently configured values.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(
        &self,
        config: &RecognitionConfig,
        audio: &[u8],
    ) -> Result<RecognitionResult, AppError>;
}

/// Flatten a recognition result to the response transcript: the top
/// alternative of each segment, in order, joined with newlines.
///
/// An empty result list yields an empty string. A segment without any
/// alternatives contributes nothing (the remaining segments keep their
/// order).
pub fn join_transcript(result: &RecognitionResult) -> String {
    result
        .results
        .iter()
        .filter_map(|segment| segment.alternatives.first())
        .map(|alternative| alternative.transcript.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the recognition backend used by the running server.
pub fn build_recognizer(_config: &AppConfig) -> Arc<dyn SpeechRecognizer> {
    Arc::new(google::GoogleSpeechClient::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(alternatives: &[&str]) -> RecognitionSegment {
        RecognitionSegment {
            alternatives: alternatives
                .iter()
                .map(|text| SegmentAlternative {
                    transcript: text.to_string(),
                    confidence: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_join_picks_top_alternative_per_segment() {
        let result = RecognitionResult {
            results: vec![
                segment(&["hello", "hollow"]),
                segment(&["world", "whirled"]),
            ],
        };
        assert_eq!(join_transcript(&result), "hello\nworld");
    }

    #[test]
    fn test_join_empty_result_is_empty_string() {
        assert_eq!(join_transcript(&RecognitionResult::default()), "");
    }

    #[test]
    fn test_join_skips_segments_without_alternatives() {
        let result = RecognitionResult {
            results: vec![segment(&["first"]), segment(&[]), segment(&["last"])],
        };
        assert_eq!(join_transcript(&result), "first\nlast");
    }

    /// The wire format uses camelCase field names and may omit fields.
    #[test]
    fn test_deserialize_wire_response() {
        let body = r#"{
            "results": [
                {"alternatives": [{"transcript": "hello", "confidence": 0.92}]},
                {"alternatives": [{"transcript": "world"}]}
            ]
        }"#;
        let result: RecognitionResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.results[0].alternatives[0].confidence, Some(0.92));
        assert_eq!(join_transcript(&result), "hello\nworld");
    }

    #[test]
    fn test_deserialize_empty_response() {
        let result: RecognitionResult = serde_json::from_str("{}").unwrap();
        assert!(result.results.is_empty());
        assert_eq!(join_transcript(&result), "");
    }
}
