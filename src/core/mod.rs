pub mod playback;
pub mod roles;
pub mod script;
pub mod session;
pub mod store;
pub mod tts;
pub mod verify;

// Re-export commonly used types for convenience
pub use playback::{OutboundFrame, PlaybackHandle, PlaybackRequest, spawn_dispatcher};
pub use roles::{Gender, Role, RoleAssignment, VoiceMap};
pub use script::{ScriptLine, character_names, parse_script};
pub use session::{InboundEvent, SessionConfig, SessionError, SessionRunner};
pub use store::{MemoryScriptStore, ScriptStore, StoreError, StoredScript, script_hash};
pub use tts::{SpeechSynthesizer, SynthesisError, SynthesisResult, create_synthesizer};
pub use verify::{SpeechVerifier, VerifyOutcome, similarity_score};
