// src/mint/receipt.rs

use anyhow::Result;
use async_trait::async_trait;
use ethers_core::types::{Address, Log, TransactionReceipt, H256, U256, U64};
use ethers_core::utils::keccak256;
use lazy_static::lazy_static;

lazy_static! {
    /// topic0 of `Transfer(address,address,uint256)`.
    pub static ref TRANSFER_TOPIC: H256 =
        H256::from(keccak256("Transfer(address,address,uint256)".as_bytes()));
}

/// Read access to the chain the collection lives on.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `Ok(None)` while the transaction is still pending.
    async fn transaction_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>>;

    async fn total_supply(&self, contract: Address) -> Result<U256>;
}

fn is_minted_transfer(log: &Log) -> bool {
    log.topics.len() >= 4 && log.topics[0] == *TRANSFER_TOPIC
}

/// Token id carried by the indexed third argument of an ERC-721 `Transfer` log.
///
/// Logs emitted by `contract` win over transfers from other contracts in the
/// same transaction.
pub fn decode_minted_token_id(receipt: &TransactionReceipt, contract: Address) -> Option<U256> {
    let log = receipt
        .logs
        .iter()
        .find(|log| log.address == contract && is_minted_transfer(log))
        .or_else(|| receipt.logs.iter().find(|log| is_minted_transfer(log)))?;
    Some(U256::from_big_endian(log.topics[3].as_bytes()))
}

pub fn is_reverted(receipt: &TransactionReceipt) -> bool {
    receipt.status == Some(U64::zero())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn transfer_log(contract: Address, token_id: u64) -> Log {
        let mut id = [0u8; 32];
        U256::from(token_id).to_big_endian(&mut id);
        Log {
            address: contract,
            topics: vec![
                *TRANSFER_TOPIC,
                H256::zero(),
                H256::repeat_byte(0x11),
                H256::from(id),
            ],
            ..Default::default()
        }
    }

    pub fn receipt_with(logs: Vec<Log>) -> TransactionReceipt {
        TransactionReceipt {
            logs,
            status: Some(U64::one()),
            ..Default::default()
        }
    }

    #[test]
    fn test_transfer_topic_matches_erc721() {
        assert_eq!(
            format!("{:?}", *TRANSFER_TOPIC),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_prefers_collection_logs() {
        let collection = Address::repeat_byte(0x38);
        let other = Address::repeat_byte(0x99);
        let receipt = receipt_with(vec![transfer_log(other, 5), transfer_log(collection, 812)]);
        assert_eq!(decode_minted_token_id(&receipt, collection), Some(U256::from(812)));

        // foreign transfer is still better than nothing
        let receipt = receipt_with(vec![transfer_log(other, 5)]);
        assert_eq!(decode_minted_token_id(&receipt, collection), Some(U256::from(5)));
    }

    #[test]
    fn test_erc20_style_transfer_is_ignored() {
        let collection = Address::repeat_byte(0x38);
        let mut log = transfer_log(collection, 1);
        log.topics.truncate(3);
        let receipt = receipt_with(vec![log]);
        assert_eq!(decode_minted_token_id(&receipt, collection), None);
        assert!(!is_reverted(&receipt));
    }
}
