//! Small helpers shared by the router, normalizer and orchestrator

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref EVM_ADDRESS: Regex = Regex::new(r"(?i)\b0x[0-9a-f]{40}\b").unwrap();
}

/// Returns the first `0x` + 40 hex digit address found in `text`, exactly as written.
pub fn extract_address(text: &str) -> Option<String> {
    EVM_ADDRESS.find(text).map(|m| m.as_str().to_string())
}

/// `0x387ccF5d1c9928222dD4572dD4e3cd056513e3D6` -> `0x387c...e3D6`
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Reads a count that upstream services send either as a number or a decimal string.
pub fn value_as_u64(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads an identifier that upstream services send either as a string or a number.
pub fn value_as_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
