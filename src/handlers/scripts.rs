//! Script upload endpoint.
//!
//! Accepts cleaned script text, parses it, deduplicates it per user, and
//! returns the character list so the client can assign roles before starting
//! a session. Document extraction (PDF, OCR) happens upstream; the
//! [`ScriptExtractor`] trait is that collaborator's boundary, and the shipped
//! implementation only normalizes already-extracted plain text.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::script::{character_names, parse_script};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// Boundary for the script extraction collaborator.
pub trait ScriptExtractor: Send + Sync {
    /// Turns an uploaded document body into raw script text.
    fn extract(&self, body: &str) -> Result<String, String>;
}

/// Pass-through extractor for plain-text uploads: normalizes line endings and
/// strips trailing whitespace per line.
pub struct PlainTextExtractor;

impl ScriptExtractor for PlainTextExtractor {
    fn extract(&self, body: &str) -> Result<String, String> {
        Ok(body
            .replace("\r\n", "\n")
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadScriptRequest {
    pub user_uid: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct UploadScriptResponse {
    pub text: String,
    pub script_hash: String,
    pub characters: Vec<String>,
    pub deduplicated: bool,
}

/// `POST /scripts` handler.
pub async fn upload_script(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadScriptRequest>,
) -> AppResult<Json<UploadScriptResponse>> {
    if request.user_uid.trim().is_empty() {
        return Err(AppError::BadRequest("user_uid must not be empty".to_string()));
    }

    let text = PlainTextExtractor
        .extract(&request.text)
        .map_err(AppError::BadRequest)?;

    let lines = parse_script(&text);
    if lines.is_empty() {
        return Err(AppError::BadRequest(
            "Script contains no dialogue lines".to_string(),
        ));
    }
    let characters = character_names(&lines);

    let (stored, deduplicated) = state
        .script_store
        .upsert(&request.user_uid, &text, characters)
        .await?;

    tracing::info!(
        "Stored script {} for user {} (deduplicated: {})",
        stored.script_hash,
        stored.user_uid,
        deduplicated
    );

    Ok(Json(UploadScriptResponse {
        text: stored.text,
        script_hash: stored.script_hash,
        characters: stored.characters,
        deduplicated,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_extractor_normalizes_line_endings() {
        let cleaned = PlainTextExtractor
            .extract("JACK: Hello  \r\nMARY: Hi\r\n")
            .unwrap();
        assert_eq!(cleaned, "JACK: Hello\nMARY: Hi");
    }

    #[tokio::test]
    async fn test_upload_parses_and_stores_characters() {
        let state = AppState::new(crate::config::test_config());
        let response = upload_script(
            State(state.clone()),
            Json(UploadScriptRequest {
                user_uid: "user-1".to_string(),
                text: "JACK: Hello there\nMARY: Hi Jack".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.characters, vec!["JACK", "MARY"]);
        assert!(!response.deduplicated);

        // Same upload again is deduplicated.
        let again = upload_script(
            State(state),
            Json(UploadScriptRequest {
                user_uid: "user-1".to_string(),
                text: "JACK: Hello there\nMARY: Hi Jack".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(again.deduplicated);
        assert_eq!(again.script_hash, response.script_hash);
    }

    #[tokio::test]
    async fn test_upload_rejects_scripts_without_dialogue() {
        let state = AppState::new(crate::config::test_config());
        let result = upload_script(
            State(state),
            Json(UploadScriptRequest {
                user_uid: "user-1".to_string(),
                text: "no dialogue here".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
