// src/blockchain/abi.rs

use anyhow::{anyhow, Result};
use ethers_core::abi::{decode, encode, ParamType, Token};
use ethers_core::types::{Bytes, U256};
use ethers_core::utils::keccak256;
use serde_json::Value;

pub fn selector(sig: &str) -> [u8; 4] {
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&keccak256(sig.as_bytes())[0..4]);
    sel
}

/// Calldata for `sig` with ABI-encoded arguments.
pub fn encode_call(sig: &str, tokens: Vec<Token>) -> Bytes {
    let mut out = selector(sig).to_vec();
    out.extend(encode(&tokens));
    Bytes::from(out)
}

pub fn hex_to_bytes(v: &Value) -> Result<Vec<u8>> {
    let s = v.as_str().ok_or_else(|| anyhow!("eth_call result not string"))?;
    let s = s.strip_prefix("0x").unwrap_or(s);
    Ok(hex::decode(s)?)
}

/// Decodes a single `uint256` return value.
pub fn decode_u256(v: &Value) -> Option<U256> {
    let bytes = hex_to_bytes(v).ok()?;
    match decode(&[ParamType::Uint(256)], &bytes).ok()?.first() {
        Some(Token::Uint(n)) => Some(*n),
        _ => None,
    }
}

/// Parses a `0x` quantity as returned by `eth_chainId`, `eth_gasPrice` and friends.
pub fn parse_quantity(v: &Value) -> Result<U256> {
    let s = v.as_str().ok_or_else(|| anyhow!("quantity is not a string: {}", v))?;
    Ok(U256::from_str_radix(s.trim_start_matches("0x"), 16)?)
}
