//! # Tool Gateway
//!
//! Uniform call contract to the named collection operations served by the
//! MCP tool server. Every call resolves to a [`ToolResponse`] envelope; transport
//! failures, JSON-RPC errors and unparseable payloads all become `ok: false`
//! envelopes instead of Rust errors, so callers always have something to render.
//!
//! Payload-level failures reported by a tool (an `error` field inside the JSON
//! text) are *not* rewritten here: they travel as `ok: true` payloads and the
//! normalizer turns them into `Error` chat payloads.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::mcp::protocol::{Request, Response, ToolCallResult};

/// Named backend operations reachable through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolOperation {
    /// Contract-level analytics: name, symbol, totalSupply, owners.
    CollectionAnalytics,
    /// Token count plus optional per-token image and traits.
    CollectionNftCount,
    /// NFTs held by one owner inside the collection.
    NftsForOwner,
    /// Unique holder count and the top N holders (with one token's metadata each).
    NftOwners,
    /// On-chain mint status and phase.
    MintStatus,
    /// Server-side pre-validation of a mint request.
    MintValidate,
}

impl ToolOperation {
    pub fn name(&self) -> &'static str {
        match self {
            ToolOperation::CollectionAnalytics => "getCollectionAnalytics",
            ToolOperation::CollectionNftCount => "getCollectionNFTCount",
            ToolOperation::NftsForOwner => "getNFTsForOwnerV3",
            ToolOperation::NftOwners => "getNFTOwners",
            ToolOperation::MintStatus => "getMintStatus",
            ToolOperation::MintValidate => "mintNFT",
        }
    }
}

/// Result envelope of a gateway call.
///
/// Exactly one of `payload` / `error_message` is set, matching `ok`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    ok: bool,
    payload: Option<Value>,
    error_message: Option<String>,
}

impl ToolResponse {
    pub fn success(payload: Value) -> Self {
        Self {
            ok: true,
            payload: Some(payload),
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: None,
            error_message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Splits the envelope into the payload or the failure message.
    pub fn into_result(self) -> Result<Value, String> {
        match (self.payload, self.error_message) {
            (Some(payload), _) if self.ok => Ok(payload),
            (_, Some(message)) => Err(message),
            _ => Err("empty tool response".to_string()),
        }
    }
}

#[async_trait]
pub trait ToolGateway: Send + Sync {
    async fn call(&self, operation: ToolOperation, arguments: Value) -> ToolResponse;
}

/// Gateway backed by an MCP server reachable over HTTP JSON-RPC.
#[derive(Clone)]
pub struct McpGateway {
    client: Client,
    endpoint: String,
}

impl McpGateway {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn post(&self, request: &Request) -> anyhow::Result<Response> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("MCP server error: {}", status);
        }
        Ok(resp.json::<Response>().await?)
    }
}

#[async_trait]
impl ToolGateway for McpGateway {
    async fn call(&self, operation: ToolOperation, arguments: Value) -> ToolResponse {
        let request_id = Uuid::new_v4().to_string();
        info!(tool = operation.name(), id = %request_id, "Calling MCP tool");
        debug!("Tool arguments: {}", arguments);

        let request = Request::tool_call(json!(request_id), operation.name(), arguments);
        let response = match self.post(&request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(tool = operation.name(), "MCP transport failure: {}", e);
                return ToolResponse::failure(e.to_string());
            }
        };

        if let Some(err) = response.error {
            warn!(tool = operation.name(), code = err.code, "MCP tool error: {}", err.message);
            return ToolResponse::failure(err.message);
        }

        let result: ToolCallResult = match response
            .result
            .map(serde_json::from_value)
            .transpose()
        {
            Ok(Some(result)) => result,
            Ok(None) => return ToolResponse::failure("MCP response carried no result"),
            Err(e) => return ToolResponse::failure(format!("malformed MCP result: {}", e)),
        };

        let Some(text) = result.first_text() else {
            return ToolResponse::failure("no text content returned by the tool");
        };

        match serde_json::from_str::<Value>(text) {
            Ok(payload) => {
                debug!(tool = operation.name(), "Tool payload: {}", payload);
                ToolResponse::success(payload)
            }
            Err(e) => {
                warn!(tool = operation.name(), "Unparseable tool payload: {}", e);
                ToolResponse::failure(format!("unparseable tool payload: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_invariant() {
        let ok = ToolResponse::success(json!({"totalNfts": 1}));
        assert!(ok.is_ok());
        assert!(ok.payload().is_some());
        assert!(ok.error_message().is_none());

        let failed = ToolResponse::failure("down");
        assert!(!failed.is_ok());
        assert!(failed.payload().is_none());
        assert_eq!(failed.error_message(), Some("down"));
        assert_eq!(failed.into_result(), Err("down".to_string()));
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(ToolOperation::NftsForOwner.name(), "getNFTsForOwnerV3");
        assert_eq!(ToolOperation::MintValidate.name(), "mintNFT");
        assert_eq!(ToolOperation::CollectionNftCount.name(), "getCollectionNFTCount");
    }

    #[test]
    fn test_envelope_serializes_camel_case() {
        let v = serde_json::to_value(ToolResponse::failure("x")).unwrap();
        assert_eq!(v, json!({"ok": false, "payload": null, "errorMessage": "x"}));
    }
}
