// src/chat/request.rs

use serde::Deserialize;

use crate::chat::intent::classify;
use crate::chat::payload::ChatPayload;
use crate::chat::router::CommandRouter;
use crate::error::ChatError;

/// Body of `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<MessageContent>,
    /// Some clients send structured parts next to (or instead of) `content`.
    #[serde(default)]
    pub parts: Option<Vec<ContentPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

fn first_text(parts: &[ContentPart]) -> Option<&str> {
    parts
        .iter()
        .find(|p| p.kind == "text")
        .and_then(|p| p.text.as_deref())
}

impl ChatMessage {
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(MessageContent::Text(text)) => Some(text.as_str()),
            Some(MessageContent::Parts(parts)) => first_text(parts),
            None => self.parts.as_deref().and_then(first_text),
        }
    }

    fn is_user(&self) -> bool {
        self.role.as_deref().map_or(true, |r| r == "user")
    }
}

impl ChatRequest {
    /// The last user turn's text. Earlier turns are never classified.
    pub fn utterance(&self) -> Result<&str, ChatError> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_user())
            .and_then(ChatMessage::text)
            .ok_or(ChatError::EmptyInput)
    }
}

/// Classifies and routes one utterance. Never fails.
pub async fn respond(router: &CommandRouter, text: &str) -> ChatPayload {
    match classify(text) {
        Ok(intent) => router.route(&intent).await,
        Err(e) => ChatPayload::error(e.user_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> ChatRequest {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_string_and_part_content() {
        let req = parse(json!({"messages": [{"role": "user", "content": "Collection stats"}]}));
        assert_eq!(req.utterance(), Ok("Collection stats"));

        let req = parse(json!({"messages": [{"role": "user", "content": [
            {"type": "image", "url": "x"},
            {"type": "text", "text": "Mint status"}
        ]}]}));
        assert_eq!(req.utterance(), Ok("Mint status"));

        let req = parse(json!({"messages": [{"parts": [{"type": "text", "text": "gm"}]}]}));
        assert_eq!(req.utterance(), Ok("gm"));
    }

    #[test]
    fn test_only_last_user_turn_counts() {
        let req = parse(json!({"messages": [
            {"role": "user", "content": "mint me a medalist"},
            {"role": "assistant", "content": "{\"kind\":\"mintReady\"}"},
            {"role": "user", "content": "top holders"},
            {"role": "assistant", "content": "..."}
        ]}));
        assert_eq!(req.utterance(), Ok("top holders"));
    }

    #[test]
    fn test_empty_messages() {
        assert_eq!(parse(json!({"messages": []})).utterance(), Err(ChatError::EmptyInput));
        assert_eq!(parse(json!({})).utterance(), Err(ChatError::EmptyInput));
    }
}
