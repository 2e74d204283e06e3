pub mod hub;
pub mod types;

pub use hub::{ChatError, ChatHub};
pub use types::{InboundMessage, OutboundMessage, Reply};
