//! Cartesia Text-to-Speech synthesizer.
//!
//! Calls the Cartesia TTS bytes REST API:
//! - URL: `https://api.cartesia.ai/tts/bytes`
//! - Authentication: `Authorization: Bearer {api_key}` header
//! - Version: `Cartesia-Version` header
//! - Output: raw PCM s16le at the configured sample rate

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use tracing::debug;

use super::{SpeechSynthesizer, SynthesisError, SynthesisResult};

/// Cartesia TTS bytes endpoint.
pub const CARTESIA_TTS_URL: &str = "https://api.cartesia.ai/tts/bytes";

/// Cartesia API version header value.
const CARTESIA_API_VERSION: &str = "2024-06-10";

/// Default Cartesia voice model.
const CARTESIA_MODEL_ID: &str = "sonic-2";

pub struct CartesiaSynthesizer {
    client: reqwest::Client,
    api_key: String,
    sample_rate: u32,
}

impl CartesiaSynthesizer {
    pub fn new(api_key: String, sample_rate: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            sample_rate,
        }
    }

    fn build_body(&self, text: &str, voice_id: &str) -> serde_json::Value {
        json!({
            "model_id": CARTESIA_MODEL_ID,
            "transcript": text,
            "voice": {
                "mode": "id",
                "id": voice_id
            },
            "language": "en",
            "output_format": {
                "container": "raw",
                "encoding": "pcm_s16le",
                "sample_rate": self.sample_rate
            }
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for CartesiaSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> SynthesisResult<Bytes> {
        debug!("Cartesia synthesis request: {} chars", text.len());

        let response = self
            .client
            .post(CARTESIA_TTS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Cartesia-Version", CARTESIA_API_VERSION)
            .header("Content-Type", "application/json")
            .header("Accept", "application/octet-stream")
            .json(&self.build_body(text, voice_id))
            .send()
            .await
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ProviderError(format!(
                "Cartesia TTS returned {status}: {body}"
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))
    }

    fn provider_name(&self) -> &str {
        "cartesia"
    }
}
