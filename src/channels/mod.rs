use crate::chat::{ChatHub, OutboundMessage};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub mod line;

pub use line::{LINE_CHANNEL_NAME, LineChannel, LineSettings};

/// A messaging platform adapter. It feeds user messages into the hub and
/// delivers the router's replies back to the platform.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Start the channel: register its outbound queue with the hub and spawn
    /// its background tasks. Returns once setup is done.
    async fn start(&self, hub: Arc<ChatHub>) -> Result<()>;

    /// Deliver one reply to the platform.
    async fn send(&self, message: OutboundMessage) -> Result<()>;
}
