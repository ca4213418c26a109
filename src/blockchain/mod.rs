// src/blockchain/mod.rs

// Raw JSON-RPC plumbing and the chain-facing halves of the mint flow
pub mod abi;
pub mod reader;
pub mod rpc;
pub mod signer;

pub use reader::RpcChainReader;
pub use signer::LocalWalletSession;
