// src/api/chat.rs

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, warn};

use crate::chat::payload::ChatPayload;
use crate::chat::request::{respond, ChatRequest};
use crate::AppState;

/// Size of one streamed text delta, in characters.
const DELTA_CHARS: usize = 64;

/// `POST /api/chat`: answers the last user message with one `ChatPayload`,
/// streamed as chunked `text/plain` deltas. Unreadable bodies are answered
/// the same way, with an `Error` payload.
pub async fn chat_handler(
    State(state): State<AppState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let payload = match request {
        Ok(Json(request)) => answer(&state, &request).await,
        Err(rejection) => {
            warn!(status = %rejection.status(), "Unreadable chat request: {}", rejection.body_text());
            ChatPayload::error(
                "Sorry, that message could not be read. Please send it as JSON like {\"messages\": [{\"role\": \"user\", \"content\": \"Show me collection stats\"}]}.",
            )
        }
    };
    stream_payload(&payload)
}

async fn answer(state: &AppState, request: &ChatRequest) -> ChatPayload {
    match request.utterance() {
        Ok(text) => {
            info!(utterance = text, "Chat request");
            respond(&state.router, text).await
        }
        Err(_) if request.messages.is_empty() => ChatPayload::error(
            "Please send a message to get started. Try \"Show me collection stats\" or \"Mint me a Medalist\".",
        ),
        Err(e) => ChatPayload::error(e.user_message()),
    }
}

fn stream_payload(payload: &ChatPayload) -> Response {
    let body = match serde_json::to_string(payload) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to serialize chat payload: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "serialization failure").into_response();
        }
    };

    let chunks = text_deltas(&body, DELTA_CHARS);
    let stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, Infallible>));
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response()
}

/// Splits `text` into pieces of at most `size` characters.
pub fn text_deltas(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}
