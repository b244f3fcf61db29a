//! Chat endpoint: route a typed message, synthesize the reply for the browser

use std::path::Path;
use std::sync::Arc;

use axum::{Json, Router, body::Bytes, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use super::{ApiState, AUDIO_URL_PREFIX};
use crate::Result;
use crate::voice::Synthesizer;

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .with_state(state)
}

/// Chat request; a missing message is treated as empty
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    /// URL of the synthesized reply, `None` when synthesis failed
    pub audio_url: Option<String>,
}

/// Route a message and attach a voiced copy of the reply
///
/// The body is read as JSON whatever its content type. Anything that is not
/// a JSON object counts as an empty message.
async fn chat(State(state): State<Arc<ApiState>>, body: Bytes) -> Json<ChatResponse> {
    let request: ChatRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "unreadable chat body, treating as empty");
        ChatRequest::default()
    });

    let reply = state.assistant.handle(&request.message).await;

    let audio_url = match &state.synthesizer {
        Some(synthesizer) => {
            match save_reply_audio(synthesizer.as_ref(), &state.audio_dir, &reply.text).await {
                Ok(file_name) => Some(format!("{AUDIO_URL_PREFIX}/{file_name}")),
                Err(e) => {
                    tracing::error!(error = %e, "failed to voice reply");
                    None
                }
            }
        }
        None => None,
    };

    Json(ChatResponse {
        reply: reply.text,
        audio_url,
    })
}

/// Synthesize `text` into a uniquely named MP3 under `dir`
///
/// # Errors
///
/// Returns error if synthesis or the file write fails
pub async fn save_reply_audio(
    synthesizer: &dyn Synthesizer,
    dir: &Path,
    text: &str,
) -> Result<String> {
    let audio = synthesizer.synthesize(text).await?;

    tokio::fs::create_dir_all(dir).await?;
    let file_name = format!("{}.mp3", uuid::Uuid::new_v4().simple());
    let path = dir.join(&file_name);
    tokio::fs::write(&path, &audio).await?;

    tracing::debug!(path = %path.display(), bytes = audio.len(), "saved reply audio");
    Ok(file_name)
}
