//! Mint lifecycle: validation hand-off, wallet signing, receipt tracking.
pub mod orchestrator;
pub mod receipt;
pub mod state;
pub mod wallet;
pub mod watch;
