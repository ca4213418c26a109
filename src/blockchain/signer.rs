// src/blockchain/signer.rs

use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers_core::types::{TransactionRequest, H256, U256};
use ethers_core::utils::to_checksum;
use ethers_signers::{LocalWallet, Signer};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::info;

use crate::blockchain::abi::parse_quantity;
use crate::blockchain::rpc::RpcClient;
use crate::mint::state::MintCall;
use crate::mint::wallet::{WalletError, WalletSession};

/// A wallet backed by a private key held in process, signing locally and
/// broadcasting through raw JSON-RPC.
pub struct LocalWalletSession {
    wallet: LocalWallet,
    rpc: RpcClient,
}

impl LocalWalletSession {
    pub fn new(private_key: &SecretString, rpc_url: &str) -> Result<Self> {
        let wallet = LocalWallet::from_str(private_key.expose_secret().trim_start_matches("0x"))
            .map_err(|e| anyhow!("Invalid private key: {}", e))?;
        Ok(Self {
            wallet,
            rpc: RpcClient::new(rpc_url),
        })
    }

    async fn node_chain_id(&self) -> Result<u64> {
        let result = self.rpc.request("eth_chainId", json!([])).await?;
        chain_id_from(&result)
    }

    async fn send(&self, call: &MintCall) -> Result<H256> {
        let from = self.wallet.address();
        let chain_id = self.node_chain_id().await?;

        let nonce = parse_quantity(
            &self
                .rpc
                .request("eth_getTransactionCount", json!([format!("{:?}", from), "pending"]))
                .await?,
        )
        .context("Failed to get nonce from RPC")?;

        let mut tx = TransactionRequest::new()
            .from(from)
            .to(call.to)
            .value(call.value)
            .data(call.data.clone())
            .nonce(nonce)
            .chain_id(chain_id);

        let gas = self
            .rpc
            .request("eth_estimateGas", json!([serde_json::to_value(&tx)?]))
            .await?;
        tx = tx.gas(parse_quantity(&gas).context("Failed to get gas estimate")?);

        let gas_price = self.rpc.request("eth_gasPrice", json!([])).await?;
        tx = tx.gas_price(parse_quantity(&gas_price).context("Failed to get gasPrice")?);

        let signature = self.wallet.sign_transaction(&tx.clone().into()).await?;
        let raw_tx = tx.rlp_signed(&signature);

        let result = self
            .rpc
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw_tx))]),
            )
            .await?;
        let hash = result
            .as_str()
            .ok_or_else(|| anyhow!("Failed to extract transaction hash from response"))?;
        Ok(H256::from_str(hash)?)
    }
}

fn chain_id_from(result: &Value) -> Result<u64> {
    let chain_id = parse_quantity(result).context("Failed to get chain_id from RPC")?;
    if chain_id > U256::from(u64::MAX) {
        return Err(anyhow!("Chain id {} does not fit in 64 bits", chain_id));
    }
    Ok(chain_id.as_u64())
}

#[async_trait]
impl WalletSession for LocalWalletSession {
    async fn chain_id(&self) -> Result<u64, WalletError> {
        self.node_chain_id()
            .await
            .map_err(|e| WalletError::Failed(e.to_string()))
    }

    fn address(&self) -> Option<String> {
        Some(to_checksum(&self.wallet.address(), None))
    }

    async fn submit_mint(&self, call: &MintCall) -> Result<H256, WalletError> {
        let hash = self
            .send(call)
            .await
            .map_err(|e| WalletError::Failed(e.to_string()))?;
        info!(tx = ?hash, "Mint transaction broadcast");
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_checksummed() {
        // Well-known hardhat account #0
        let key = SecretString::new(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
        );
        let session = LocalWalletSession::new(&key, "http://localhost:8545").unwrap();
        assert_eq!(
            session.address().as_deref(),
            Some("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }

    #[test]
    fn test_bad_key_is_rejected() {
        let key = SecretString::new("not-a-key".to_string());
        assert!(LocalWalletSession::new(&key, "http://localhost:8545").is_err());
    }

    #[test]
    fn test_chain_id_parsing() {
        assert_eq!(chain_id_from(&json!("0x168")).unwrap(), 360);
        assert!(chain_id_from(&json!("0x10000000000000000")).is_err());
        assert!(chain_id_from(&json!(null)).is_err());
    }
}
