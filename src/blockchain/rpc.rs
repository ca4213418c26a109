// src/blockchain/rpc.rs

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

/// Minimal Ethereum JSON-RPC client over reqwest.
#[derive(Clone, Debug)]
pub struct RpcClient {
    client: Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Sends one request and returns its `result` (which may be `null`).
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        debug!(method, "RPC request");

        let response: Value = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("{} request failed", method))?
            .json()
            .await
            .with_context(|| format!("{} returned a non-JSON body", method))?;

        if let Some(err) = response.get("error") {
            return Err(anyhow!("RPC Error in {}: {}", method, err));
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}
