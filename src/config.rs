use std::env;
use std::time::Duration;

use crate::core::roles::VoiceMap;
use crate::core::session::SessionConfig;

// Default Cartesia voice identities per gender.
const DEFAULT_MALE_VOICE: &str = "c99d36f3-5ffd-4253-803a-535c1bc9c306";
const DEFAULT_FEMALE_VOICE: &str = "bc46586b-b463-4367-a96e-44127177a521";
const DEFAULT_NEUTRAL_VOICE: &str = "c99d36f3-5ffd-4253-803a-535c1bc9c306";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    pub cartesia_api_key: Option<String>,
    pub deepgram_api_key: Option<String>,

    /// Synthesis backend used for sessions ("cartesia" or "deepgram").
    pub tts_provider: String,
    /// PCM s16le sample rate for synthesized audio.
    pub tts_sample_rate: u32,

    // Session tuning
    pub match_threshold: u8,
    pub silence_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub retry_prompt: String,

    // Gender to voice identity mapping
    pub male_voice_id: String,
    pub female_voice_id: String,
    pub neutral_voice_id: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid port number: {e}"))?;

        let cartesia_api_key = env::var("CARTESIA_API_KEY").ok();
        let deepgram_api_key = env::var("DEEPGRAM_API_KEY").ok();

        let tts_provider = env::var("TTS_PROVIDER").unwrap_or_else(|_| "cartesia".to_string());
        let tts_sample_rate = env::var("TTS_SAMPLE_RATE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(16000);

        let match_threshold = env::var("MATCH_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<u8>().ok())
            .unwrap_or(65);
        if match_threshold > 100 {
            return Err(format!("MATCH_THRESHOLD must be 0-100, got {match_threshold}").into());
        }

        let silence_timeout_ms = env::var("SILENCE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1500);
        let poll_interval_ms = env::var("POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(250);

        let retry_prompt =
            env::var("RETRY_PROMPT").unwrap_or_else(|_| "Please try again.".to_string());

        let male_voice_id =
            env::var("MALE_VOICE_ID").unwrap_or_else(|_| DEFAULT_MALE_VOICE.to_string());
        let female_voice_id =
            env::var("FEMALE_VOICE_ID").unwrap_or_else(|_| DEFAULT_FEMALE_VOICE.to_string());
        let neutral_voice_id =
            env::var("NEUTRAL_VOICE_ID").unwrap_or_else(|_| DEFAULT_NEUTRAL_VOICE.to_string());

        Ok(ServerConfig {
            host,
            port,
            cartesia_api_key,
            deepgram_api_key,
            tts_provider,
            tts_sample_rate,
            match_threshold,
            silence_timeout_ms,
            poll_interval_ms,
            retry_prompt,
            male_voice_id,
            female_voice_id,
            neutral_voice_id,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the API key for a specific synthesis provider
    pub fn get_api_key(&self, provider: &str) -> Result<String, String> {
        match provider.to_lowercase().as_str() {
            "cartesia" => self.cartesia_api_key.as_ref().cloned().ok_or_else(|| {
                "Cartesia API key not configured in server environment".to_string()
            }),
            "deepgram" => self.deepgram_api_key.as_ref().cloned().ok_or_else(|| {
                "Deepgram API key not configured in server environment".to_string()
            }),
            _ => Err(format!("Unsupported provider: {provider}")),
        }
    }

    pub fn voice_map(&self) -> VoiceMap {
        VoiceMap {
            male: self.male_voice_id.clone(),
            female: self.female_voice_id.clone(),
            neutral: self.neutral_voice_id.clone(),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            match_threshold: self.match_threshold,
            silence_timeout: Duration::from_millis(self.silence_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            retry_prompt: self.retry_prompt.clone(),
            voices: self.voice_map(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cartesia_api_key: Some("test-cartesia-key".to_string()),
        deepgram_api_key: None,
        tts_provider: "cartesia".to_string(),
        tts_sample_rate: 16000,
        match_threshold: 65,
        silence_timeout_ms: 1500,
        poll_interval_ms: 250,
        retry_prompt: "Please try again.".to_string(),
        male_voice_id: "male-voice".to_string(),
        female_voice_id: "female-voice".to_string(),
        neutral_voice_id: "neutral-voice".to_string(),
    }
}
