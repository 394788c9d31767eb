//! Speech synthesis provider abstraction.
//!
//! The session core never talks to a vendor API directly; it goes through the
//! [`SpeechSynthesizer`] trait so the backend is configuration, not behavior.
//! Providers turn `(text, voice id)` into raw PCM bytes (16-bit signed
//! little-endian at the configured sample rate) in a single request/response —
//! streaming synthesis is not needed for turn-by-turn playback.

pub mod cartesia;
pub mod deepgram;

pub use cartesia::CartesiaSynthesizer;
pub use deepgram::DeepgramSynthesizer;

use async_trait::async_trait;
use bytes::Bytes;

/// Synthesis-specific error types.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SynthesisError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for synthesis operations.
pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// A one-shot text-to-speech backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes `text` with the given voice identity, returning raw PCM
    /// s16le bytes. May fail; callers decide whether a failure is fatal.
    async fn synthesize(&self, text: &str, voice_id: &str) -> SynthesisResult<Bytes>;

    /// Provider name for logging.
    fn provider_name(&self) -> &str;
}

/// Factory function to create a synthesis provider.
///
/// # Supported providers
///
/// - `"cartesia"` - Cartesia TTS bytes API (Sonic voice models)
/// - `"deepgram"` - Deepgram Aura speak API
pub fn create_synthesizer(
    provider: &str,
    api_key: &str,
    sample_rate: u32,
) -> SynthesisResult<Box<dyn SpeechSynthesizer>> {
    if api_key.is_empty() {
        return Err(SynthesisError::InvalidConfiguration(format!(
            "No API key configured for synthesis provider: {provider}"
        )));
    }
    match provider.to_lowercase().as_str() {
        "cartesia" => Ok(Box::new(CartesiaSynthesizer::new(
            api_key.to_string(),
            sample_rate,
        ))),
        "deepgram" => Ok(Box::new(DeepgramSynthesizer::new(
            api_key.to_string(),
            sample_rate,
        ))),
        _ => Err(SynthesisError::InvalidConfiguration(format!(
            "Unsupported synthesis provider: {provider}. Supported providers: cartesia, deepgram"
        ))),
    }
}
