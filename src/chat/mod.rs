//! Conversational side: classify an utterance, route it, normalize the answer.
pub mod intent;
pub mod normalizer;
pub mod payload;
pub mod request;
pub mod router;
pub mod session;
