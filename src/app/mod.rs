//! Session context and the client state container

pub mod session;
pub mod state;

pub use state::ClientState;
