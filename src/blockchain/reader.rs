// src/blockchain/reader.rs

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers_core::types::{Address, TransactionReceipt, H256, U256};
use serde_json::{json, Value};

use crate::blockchain::abi::{decode_u256, encode_call};
use crate::blockchain::rpc::RpcClient;
use crate::mint::receipt::ChainReader;

/// [`ChainReader`] over a plain JSON-RPC endpoint.
#[derive(Clone, Debug)]
pub struct RpcChainReader {
    rpc: RpcClient,
}

impl RpcChainReader {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc: RpcClient::new(rpc_url),
        }
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn transaction_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>> {
        let result = self
            .rpc
            .request("eth_getTransactionReceipt", json!([format!("{:?}", tx_hash)]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let receipt = serde_json::from_value(result).context("Malformed transaction receipt")?;
        Ok(Some(receipt))
    }

    async fn total_supply(&self, contract: Address) -> Result<U256> {
        let data = encode_call("totalSupply()", vec![]);
        let result: Value = self
            .rpc
            .request(
                "eth_call",
                json!([{"to": format!("{:?}", contract), "data": format!("0x{}", hex::encode(data))}, "latest"]),
            )
            .await?;
        decode_u256(&result).ok_or_else(|| anyhow!("totalSupply() returned {}", result))
    }
}
