// src/mcp/protocol.rs

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(default)]
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// One entry of a `tools/call` result's `content` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// The `result` object of a `tools/call` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ContentItem>,
}

impl ToolCallResult {
    /// Text of the first `text` content item, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|item| item.kind == "text")
            .and_then(|item| item.text.as_deref())
    }
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

impl Request {
    /// Builds a `tools/call` request for the named operation.
    pub fn tool_call(id: Value, name: &str, arguments: Value) -> Self {
        Self {
            jsonrpc: default_jsonrpc(),
            id,
            method: "tools/call".to_string(),
            params: Some(json!({
                "name": name,
                "arguments": arguments,
            })),
        }
    }
}
