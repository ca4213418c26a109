// src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use ethers_core::types::{Address, U256};
use secrecy::SecretString;

use crate::chat::router::CollectionInfo;
use crate::mint::state::MintSettings;

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x387ccF5d1c9928222dD4572dD4e3cd056513e3D6";
pub const SHAPE_MAINNET_CHAIN_ID: u64 = 360;

// A struct to hold all configuration, loaded once at startup from the .env file.
#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub port: u16,

    /// JSON-RPC endpoint of the MCP tool server backing the Tool Gateway
    pub mcp_server_url: String,

    // Collection / chain settings
    pub chain_id: u64,
    pub rpc_url: String,
    pub contract_address: String,
    pub explorer_tx_url: String,

    // Mint settings
    pub mint_price_wei: U256,
    pub collector_fee_wei: U256,
    pub receipt_max_attempts: u32,
    pub receipt_poll_delay: Duration,

    /// Signing key for session mode. Never logged.
    pub wallet_private_key: Option<SecretString>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            mcp_server_url: "http://localhost:3002/mcp".to_string(),
            chain_id: SHAPE_MAINNET_CHAIN_ID,
            rpc_url: "https://mainnet.shape.network".to_string(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            explorer_tx_url: "https://shapescan.xyz/tx".to_string(),
            mint_price_wei: U256::from(2_600_000_000_000_000u64),
            collector_fee_wei: U256::from(400_000_000_000_000u64),
            receipt_max_attempts: 10,
            receipt_poll_delay: Duration::from_secs(10),
            wallet_private_key: None,
        }
    }
}

impl Config {
    /// `shape-mainnet` for chain 360, `shape-sepolia` for anything else.
    pub fn network_name(&self) -> &'static str {
        if self.chain_id == SHAPE_MAINNET_CHAIN_ID {
            "shape-mainnet"
        } else {
            "shape-sepolia"
        }
    }

    /// Collection facts the router stamps onto every summary.
    pub fn collection(&self) -> CollectionInfo {
        CollectionInfo {
            contract_address: self.contract_address.clone(),
            network: self.network_name().to_string(),
            chain_id: self.chain_id,
        }
    }

    /// Parameters of the on-chain mint the orchestrator drives.
    pub fn mint_settings(&self) -> Result<MintSettings> {
        let contract = Address::from_str(&self.contract_address)
            .context("CONTRACT_ADDRESS must be a 0x-prefixed 20 byte address")?;
        Ok(MintSettings {
            contract,
            required_chain_id: self.chain_id,
            mint_price: self.mint_price_wei,
            collector_fee: self.collector_fee_wei,
            max_attempts: self.receipt_max_attempts,
            poll_delay: self.receipt_poll_delay,
            explorer_tx_url: self.explorer_tx_url.clone(),
        })
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let mcp_server_url =
            env::var("MCP_SERVER_URL").unwrap_or_else(|_| defaults.mcp_server_url.clone());
        url::Url::parse(&mcp_server_url).context("MCP_SERVER_URL must be a valid URL")?;

        let contract_address =
            env::var("CONTRACT_ADDRESS").unwrap_or_else(|_| defaults.contract_address.clone());
        Address::from_str(&contract_address)
            .context("CONTRACT_ADDRESS must be a 0x-prefixed 20 byte address")?;

        let mint_price_wei = match env::var("MINT_PRICE_WEI") {
            Ok(v) => U256::from_dec_str(&v).context("MINT_PRICE_WEI must be a decimal wei amount")?,
            Err(_) => defaults.mint_price_wei,
        };
        let collector_fee_wei = match env::var("COLLECTOR_FEE_WEI") {
            Ok(v) => {
                U256::from_dec_str(&v).context("COLLECTOR_FEE_WEI must be a decimal wei amount")?
            }
            Err(_) => defaults.collector_fee_wei,
        };

        let poll_delay_secs: u64 = env::var("RECEIPT_POLL_DELAY_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("RECEIPT_POLL_DELAY_SECS must be a valid number")?;

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            mcp_server_url,
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| SHAPE_MAINNET_CHAIN_ID.to_string())
                .parse()
                .context("CHAIN_ID must be a valid number")?,
            rpc_url: env::var("RPC_URL").unwrap_or(defaults.rpc_url),
            contract_address,
            explorer_tx_url: env::var("EXPLORER_TX_URL").unwrap_or(defaults.explorer_tx_url),
            mint_price_wei,
            collector_fee_wei,
            receipt_max_attempts: env::var("RECEIPT_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("RECEIPT_MAX_ATTEMPTS must be a valid number")?,
            receipt_poll_delay: Duration::from_secs(poll_delay_secs),
            wallet_private_key: env::var("WALLET_PRIVATE_KEY").ok().map(SecretString::new),
        })
    }
}
