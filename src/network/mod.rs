pub mod client;
pub mod discovery;
pub mod error;
pub mod heartbeat;
pub mod protocol;
pub mod reaper;
pub mod registry;
pub mod transport;

pub use client::P2PClient;
