//! Session orchestration: driving a rehearsal script turn by turn.
//!
//! The session loop and verifier run as one cooperative task that owns the
//! role assignment, the turn index, and the transcript accumulator; the
//! playback worker is the only other task, reached solely through the FIFO
//! queue. AI turns are fire-and-continue — ordering on the wire is the
//! dispatcher's job, not this loop's. User turns first wait on the drain gate
//! (so the user is never asked to speak over in-flight AI audio) and then run
//! the verifier until the line matches.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use tracing::{debug, info};

use super::playback::{PlaybackHandle, PlaybackRequest};
use super::roles::{Gender, Role, RoleAssignment, VoiceMap};
use super::script::ScriptLine;
use super::verify::{SpeechVerifier, VerifyOutcome};

/// Events from the client channel, as seen by the session loop. The WebSocket
/// layer pumps raw frames into this shape; inbound binary audio never reaches
/// the loop (recognition happens upstream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A recognized speech fragment, partial or final.
    Transcript(String),
    /// The client closed the channel.
    Closed,
    /// An unparseable or malformed inbound frame.
    ProtocolError(String),
}

/// Fatal session failures. Verification misses are not errors — they are
/// ordinary control flow inside a user turn.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Client disconnected")]
    Disconnected,

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Tuning knobs for one session, all sourced from [`crate::ServerConfig`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Minimum similarity score for a user line to count as spoken.
    pub match_threshold: u8,
    /// Silence window that ends a user attempt.
    pub silence_timeout: Duration,
    /// Idle-poll granularity while listening; bounds endpointing latency.
    pub poll_interval: Duration,
    /// Line spoken (in the neutral voice) when an attempt misses.
    pub retry_prompt: String,
    /// Gender to voice identity mapping.
    pub voices: VoiceMap,
}

/// Runs one rehearsal session to completion.
pub struct SessionRunner {
    config: SessionConfig,
    roles: RoleAssignment,
    playback: PlaybackHandle,
    inbound: mpsc::UnboundedReceiver<InboundEvent>,
}

impl SessionRunner {
    pub fn new(
        config: SessionConfig,
        roles: RoleAssignment,
        playback: PlaybackHandle,
        inbound: mpsc::UnboundedReceiver<InboundEvent>,
    ) -> Self {
        Self {
            config,
            roles,
            playback,
            inbound,
        }
    }

    /// Drives the script in order. Returns when every line has been played or
    /// verified and all queued audio has been transmitted.
    pub async fn run(mut self, script: &[ScriptLine]) -> Result<(), SessionError> {
        for (index, line) in script.iter().enumerate() {
            match self.roles.resolve(&line.speaker) {
                Some(Role::UserControlled) => {
                    self.playback.await_drained().await;
                    self.verify_turn(&line.text).await?;
                }
                Some(Role::AiVoice(gender)) => {
                    self.playback.enqueue(PlaybackRequest {
                        text: line.text.clone(),
                        voice_id: self.config.voices.voice_id(gender).to_string(),
                    });
                }
                None => {
                    debug!(
                        "No role for speaker {} at turn {}, skipping line",
                        line.speaker, index
                    );
                }
            }
        }

        self.playback.await_drained().await;
        info!("Session complete");
        Ok(())
    }

    /// Loops Listening → Evaluating until the expected line matches. Retries
    /// without bound; only a channel failure ends the turn early.
    async fn verify_turn(&mut self, expected: &str) -> Result<(), SessionError> {
        info!("Waiting for user line: {expected}");
        let mut verifier = SpeechVerifier::new(
            expected,
            self.config.match_threshold,
            self.config.silence_timeout,
            Instant::now(),
        );

        loop {
            match timeout(self.config.poll_interval, self.inbound.recv()).await {
                Ok(Some(InboundEvent::Transcript(fragment))) => {
                    verifier.observe_fragment(&fragment, Instant::now());
                }
                Ok(Some(InboundEvent::Closed)) | Ok(None) => {
                    return Err(SessionError::Disconnected);
                }
                Ok(Some(InboundEvent::ProtocolError(message))) => {
                    return Err(SessionError::Protocol(message));
                }
                // Idle poll: no fragment arrived, re-evaluate the soft timer.
                Err(_) => {}
            }

            match verifier.poll(Instant::now()) {
                VerifyOutcome::Matched { score } => {
                    info!("User line matched at {score}%");
                    return Ok(());
                }
                VerifyOutcome::Retry { score } => {
                    info!("User line missed at {score}%, prompting retry");
                    self.playback.enqueue(PlaybackRequest {
                        text: self.config.retry_prompt.clone(),
                        voice_id: self.config.voices.voice_id(Gender::Neutral).to_string(),
                    });
                    // Let the prompt finish playing before listening again so
                    // its audio cannot bleed into the next attempt.
                    self.playback.await_drained().await;
                    verifier.reset(Instant::now());
                }
                VerifyOutcome::Listening => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::playback::{OutboundFrame, spawn_dispatcher};
    use crate::core::script::parse_script;
    use crate::core::tts::{SpeechSynthesizer, SynthesisResult};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    struct EchoSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for EchoSynthesizer {
        async fn synthesize(&self, text: &str, voice_id: &str) -> SynthesisResult<Bytes> {
            Ok(Bytes::from(format!("pcm:{voice_id}:{text}")))
        }

        fn provider_name(&self) -> &str {
            "echo"
        }
    }

    fn test_config() -> SessionConfig {
        SessionConfig {
            match_threshold: 65,
            silence_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(20),
            retry_prompt: "Please try again.".to_string(),
            voices: VoiceMap {
                male: "male-voice".to_string(),
                female: "female-voice".to_string(),
                neutral: "neutral-voice".to_string(),
            },
        }
    }

    fn jack_and_mary_roles() -> RoleAssignment {
        let user_roles: HashSet<String> = ["JACK".to_string()].into_iter().collect();
        let mut genders = HashMap::new();
        genders.insert("MARY".to_string(), Gender::Female);
        RoleAssignment::new(user_roles, genders)
    }

    async fn drain_frames(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn test_session_waits_for_user_then_plays_ai_line() {
        let script = parse_script("JACK: Hello there\nMARY: Hi Jack");
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let playback = spawn_dispatcher(Arc::new(EchoSynthesizer), out_tx);
        let runner = SessionRunner::new(test_config(), jack_and_mary_roles(), playback, in_rx);

        let session = tokio::spawn(async move { runner.run(&script).await });

        // No speech yet: the session must still be waiting on JACK's line.
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!session.is_finished());
        assert!(drain_frames(&mut out_rx).await.is_empty());

        in_tx
            .send(InboundEvent::Transcript("Hello there".to_string()))
            .unwrap();

        session.await.unwrap().expect("session should complete");

        // Exactly one playback pair, for MARY's line with the female voice.
        let frames = drain_frames(&mut out_rx).await;
        assert_eq!(frames.len(), 2);
        match &frames[0] {
            OutboundFrame::Text(json) => assert!(json.contains("Hi Jack")),
            other => panic!("Expected text frame, got {other:?}"),
        }
        match &frames[1] {
            OutboundFrame::Audio(audio) => {
                assert_eq!(audio.as_ref(), b"pcm:female-voice:Hi Jack");
            }
            other => panic!("Expected audio frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missed_line_prompts_one_retry_then_matches() {
        let script = parse_script("JACK: Hello there");
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let playback = spawn_dispatcher(Arc::new(EchoSynthesizer), out_tx);
        let runner = SessionRunner::new(test_config(), jack_and_mary_roles(), playback, in_rx);

        let session = tokio::spawn(async move { runner.run(&script).await });

        in_tx
            .send(InboundEvent::Transcript("totally different text".to_string()))
            .unwrap();

        // Wait for the retry prompt pair to come out in the neutral voice.
        tokio::time::sleep(Duration::from_millis(400)).await;
        let frames = drain_frames(&mut out_rx).await;
        assert_eq!(frames.len(), 2, "expected exactly one retry prompt pair");
        match &frames[1] {
            OutboundFrame::Audio(audio) => {
                assert_eq!(audio.as_ref(), b"pcm:neutral-voice:Please try again.");
            }
            other => panic!("Expected audio frame, got {other:?}"),
        }
        assert!(!session.is_finished());

        // Second attempt with the correct line completes the session.
        in_tx
            .send(InboundEvent::Transcript("Hello there".to_string()))
            .unwrap();
        session.await.unwrap().expect("session should complete");
    }

    #[tokio::test]
    async fn test_disconnect_during_listening_aborts_session() {
        let script = parse_script("JACK: Hello there");
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let playback = spawn_dispatcher(Arc::new(EchoSynthesizer), out_tx);
        let runner = SessionRunner::new(test_config(), jack_and_mary_roles(), playback, in_rx);

        let session = tokio::spawn(async move { runner.run(&script).await });
        drop(in_tx);

        let result = session.await.unwrap();
        assert!(matches!(result, Err(SessionError::Disconnected)));
    }

    #[tokio::test]
    async fn test_protocol_error_aborts_session() {
        let script = parse_script("JACK: Hello there");
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let playback = spawn_dispatcher(Arc::new(EchoSynthesizer), out_tx);
        let runner = SessionRunner::new(test_config(), jack_and_mary_roles(), playback, in_rx);

        let session = tokio::spawn(async move { runner.run(&script).await });
        in_tx
            .send(InboundEvent::ProtocolError("bad frame".to_string()))
            .unwrap();

        let result = session.await.unwrap();
        assert!(matches!(result, Err(SessionError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_unassigned_speakers_are_skipped() {
        let script = parse_script("NARRATOR: Scene one\nMARY: Hi Jack");
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_in_tx, in_rx) = mpsc::unbounded_channel();
        let playback = spawn_dispatcher(Arc::new(EchoSynthesizer), out_tx);
        let runner = SessionRunner::new(test_config(), jack_and_mary_roles(), playback, in_rx);

        runner.run(&script).await.expect("session should complete");

        // Only MARY's pair; the narrator line produced nothing.
        let frames = drain_frames(&mut out_rx).await;
        assert_eq!(frames.len(), 2);
    }
}
