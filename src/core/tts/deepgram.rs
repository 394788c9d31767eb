//! Deepgram Aura Text-to-Speech synthesizer.
//!
//! Calls the Deepgram speak REST API with linear16 output so both providers
//! hand back the same raw PCM s16le framing:
//! - URL: `https://api.deepgram.com/v1/speak`
//! - Authentication: `Authorization: Token {api_key}` header
//! - Voice identity: the Aura model name (e.g. `aura-asteria-en`)

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use tracing::debug;

use super::{SpeechSynthesizer, SynthesisError, SynthesisResult};

/// Deepgram speak endpoint.
pub const DEEPGRAM_TTS_URL: &str = "https://api.deepgram.com/v1/speak";

pub struct DeepgramSynthesizer {
    client: reqwest::Client,
    api_key: String,
    sample_rate: u32,
}

impl DeepgramSynthesizer {
    pub fn new(api_key: String, sample_rate: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            sample_rate,
        }
    }

    fn request_url(&self, voice_id: &str) -> String {
        format!(
            "{DEEPGRAM_TTS_URL}?model={voice_id}&encoding=linear16&container=none&sample_rate={}",
            self.sample_rate
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for DeepgramSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> SynthesisResult<Bytes> {
        debug!("Deepgram synthesis request: {} chars", text.len());

        let response = self
            .client
            .post(self.request_url(voice_id))
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ProviderError(format!(
                "Deepgram TTS returned {status}: {body}"
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))
    }

    fn provider_name(&self) -> &str {
        "deepgram"
    }
}
