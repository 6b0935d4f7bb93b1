pub mod commands;
pub mod events;
pub mod expiry;
pub mod types;

pub use commands::NetworkCommand;
pub use events::{ErrorComponent, NetworkEvent};
pub use types::{ChatMessage, Direction};
