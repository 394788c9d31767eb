//! # WebSocket Rehearsal Session Handler
//!
//! One WebSocket connection is one rehearsal session.
//!
//! ## Connection Flow
//! 1. Client connects to `/ws/session`
//! 2. Client sends the init payload as the first text frame
//! 3. Server drives the script: AI lines are synthesized and streamed back,
//!    user lines are verified against incoming transcript fragments
//! 4. Server sends a completion notice and closes
//!
//! ## Message Types
//!
//! **Incoming:**
//! - First text frame: `{"script": "...", "user_roles": ["JACK"],
//!   "ai_character_genders": {"MARY": "FEMALE"}}`
//! - Later text frames: `{"transcript": "recognized speech fragment"}`
//! - Binary frames: raw microphone audio, ignored here (speech recognition
//!   happens upstream of this server)
//!
//! **Outgoing:**
//! - `{"tts_text": "line text"}` followed by a raw PCM s16le binary frame,
//!   one pair per synthesized AI line, in script order
//! - Plain text notices on completion ("Session complete.") and on fatal
//!   errors, followed by channel close

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    core::{
        playback::{OutboundFrame, spawn_dispatcher},
        roles::{Gender, RoleAssignment},
        script::parse_script,
        session::{InboundEvent, SessionRunner},
        tts::create_synthesizer,
    },
    state::AppState,
};

/// Session initialization payload, consumed once from the first text frame.
#[derive(Debug, Deserialize)]
pub struct SessionInit {
    pub script: String,
    pub user_roles: HashSet<String>,
    pub ai_character_genders: HashMap<String, String>,
}

/// Transcript fragment frame from the client's recognizer.
#[derive(Debug, Deserialize)]
struct TranscriptFrame {
    transcript: String,
}

/// WebSocket rehearsal session handler
/// Upgrades the HTTP connection to WebSocket and runs the session to completion
pub async fn ws_session_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("WebSocket session upgrade requested");
    ws.on_upgrade(move |socket| handle_session_socket(socket, state))
}

async fn handle_session_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket session established");

    let (mut sender, mut receiver) = socket.split();

    // Single consumer of the outbound channel, so wire order equals channel
    // order for the tts_text/audio pairs.
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<OutboundFrame>();
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = outgoing_rx.recv().await {
            let message = match frame {
                OutboundFrame::Text(text) => Message::Text(text.into()),
                OutboundFrame::Audio(audio) => Message::Binary(audio),
            };
            if let Err(e) = sender.send(message).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    // Init payload must arrive before anything else happens.
    let init = match read_init_payload(&mut receiver).await {
        Ok(Some(init)) => init,
        Ok(None) => {
            info!("WebSocket closed before session init");
            drop(outgoing_tx);
            let _ = sender_task.await;
            return;
        }
        Err(message) => {
            warn!("Session init failed: {}", message);
            let _ = outgoing_tx.send(OutboundFrame::Text(format!(
                "Initialization error: {message}"
            )));
            drop(outgoing_tx);
            let _ = sender_task.await;
            return;
        }
    };

    let script = parse_script(&init.script);
    let roles = RoleAssignment::new(
        init.user_roles,
        init.ai_character_genders
            .into_iter()
            .map(|(speaker, label)| (speaker, Gender::from_label(&label)))
            .collect(),
    );
    info!("Session starting with {} script lines", script.len());

    // Synthesizer is part of initialization: a missing key fails the session
    // before the first turn rather than silently dropping every AI line.
    let provider = state.config.tts_provider.clone();
    let synthesizer = match state
        .config
        .get_api_key(&provider)
        .and_then(|key| {
            create_synthesizer(&provider, &key, state.config.tts_sample_rate)
                .map_err(|e| e.to_string())
        }) {
        Ok(synthesizer) => Arc::from(synthesizer),
        Err(message) => {
            warn!("Synthesizer init failed: {}", message);
            let _ = outgoing_tx.send(OutboundFrame::Text(format!(
                "Initialization error: {message}"
            )));
            drop(outgoing_tx);
            let _ = sender_task.await;
            return;
        }
    };

    let playback = spawn_dispatcher(synthesizer, outgoing_tx.clone());

    // Pump raw frames into session events. Binary microphone audio never
    // reaches the session loop.
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<InboundEvent>();
    let pump_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let event = match msg {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<TranscriptFrame>(&text) {
                        Ok(frame) => InboundEvent::Transcript(frame.transcript),
                        Err(e) => InboundEvent::ProtocolError(format!(
                            "Invalid message format: {e}"
                        )),
                    }
                }
                Ok(Message::Binary(data)) => {
                    debug!("Ignoring inbound audio frame: {} bytes", data.len());
                    continue;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(_)) => InboundEvent::Closed,
                Err(e) => InboundEvent::ProtocolError(format!("WebSocket error: {e}")),
            };
            let fatal = !matches!(event, InboundEvent::Transcript(_));
            if inbound_tx.send(event).is_err() || fatal {
                break;
            }
        }
        // Stream ended: receiver drop is reported as a close.
        // (Send failure just means the session already finished.)
    });

    let runner = SessionRunner::new(state.config.session_config(), roles, playback, inbound_rx);
    match runner.run(&script).await {
        Ok(()) => {
            let _ = outgoing_tx.send(OutboundFrame::Text("Session complete.".to_string()));
        }
        Err(e) => {
            warn!("Session aborted: {}", e);
            let _ = outgoing_tx.send(OutboundFrame::Text(format!("Session error: {e}")));
        }
    }

    pump_task.abort();
    drop(outgoing_tx);
    let _ = sender_task.await;
    info!("WebSocket session terminated");
}

/// Reads and parses the first text frame as the init payload.
///
/// Returns `Ok(None)` if the client disconnects first, `Err` on a malformed
/// payload (fatal, the session never starts). Control frames and stray binary
/// frames before init are ignored.
async fn read_init_payload(
    receiver: &mut futures::stream::SplitStream<WebSocket>,
) -> Result<Option<SessionInit>, String> {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                return serde_json::from_str::<SessionInit>(&text)
                    .map(Some)
                    .map_err(|e| format!("Invalid init payload: {e}"));
            }
            Ok(Message::Close(_)) => return Ok(None),
            Ok(_) => continue,
            Err(e) => return Err(format!("WebSocket error: {e}")),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_init_deserialization() {
        let json = r#"{
            "script": "JACK: Hello there\nMARY: Hi Jack",
            "user_roles": ["JACK"],
            "ai_character_genders": {"MARY": "FEMALE"}
        }"#;
        let init: SessionInit = serde_json::from_str(json).unwrap();
        assert!(init.user_roles.contains("JACK"));
        assert_eq!(init.ai_character_genders["MARY"], "FEMALE");
    }

    #[test]
    fn test_session_init_rejects_missing_keys() {
        let json = r#"{"script": "JACK: Hello"}"#;
        assert!(serde_json::from_str::<SessionInit>(json).is_err());
    }

    #[test]
    fn test_transcript_frame_deserialization() {
        let frame: TranscriptFrame =
            serde_json::from_str(r#"{"transcript": "hello there"}"#).unwrap();
        assert_eq!(frame.transcript, "hello there");

        // No transcript field is a protocol violation, not an empty fragment.
        assert!(serde_json::from_str::<TranscriptFrame>(r#"{"other": 1}"#).is_err());
    }
}
