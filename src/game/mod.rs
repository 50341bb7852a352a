//! Client-side game core: prediction, reconciliation, kickoff and latency

pub mod entity;
pub mod input;
pub mod kickoff;
pub mod latency;
pub mod r#match;
pub mod prediction;
pub mod reconcile;
pub mod view;

pub use r#match::GameClient;
