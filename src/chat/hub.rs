use crate::chat::types::{InboundMessage, OutboundMessage};
use crate::router::MessageRouter;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::sync::mpsc;

pub const QUEUE_CAPACITY: usize = 100;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Channel send failed: {0}")]
    SendError(String),
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;

/// Queues between channel adapters and the message router.
pub struct ChatHub {
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: Arc<RwLock<mpsc::Receiver<InboundMessage>>>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    outbound_rx: Arc<RwLock<mpsc::Receiver<OutboundMessage>>>,
    channels: Arc<RwLock<HashMap<String, mpsc::Sender<OutboundMessage>>>>,
}

impl ChatHub {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(QUEUE_CAPACITY);

        Self {
            inbound_tx,
            inbound_rx: Arc::new(RwLock::new(inbound_rx)),
            outbound_tx,
            outbound_rx: Arc::new(RwLock::new(outbound_rx)),
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register_channel(
        &self,
        name: impl Into<String>,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> Result<()> {
        let mut channels = self.channels.write().await;
        channels.insert(name.into(), sender);
        Ok(())
    }

    /// Drops the hub's sender for `name`. The channel sees its outbound
    /// queue close once the replies already queued have been received.
    pub async fn unregister_channel(&self, name: &str) -> bool {
        self.channels.write().await.remove(name).is_some()
    }

    pub async fn send_inbound(&self, mut message: InboundMessage) -> Result<()> {
        if !message.sanitize() {
            tracing::debug!(
                channel = %message.channel,
                sender_id = %message.sender_id,
                "Ignoring empty or whitespace-only message"
            );
            return Ok(());
        }

        match self.inbound_tx.try_send(message) {
            Ok(_) => Ok(()),
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!("Inbound buffer full, dropping oldest message");
                if let Ok(mut rx) = self.inbound_rx.try_write() {
                    let _ = rx.try_recv();
                }
                self.inbound_tx
                    .send(msg)
                    .await
                    .map_err(|e| ChatError::SendError(e.to_string()))
            }
            Err(e) => Err(ChatError::SendError(e.to_string())),
        }
    }

    pub async fn send_outbound(&self, message: OutboundMessage) -> Result<()> {
        match self.outbound_tx.try_send(message) {
            Ok(_) => Ok(()),
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!("Outbound buffer full, dropping oldest message");
                if let Ok(mut rx) = self.outbound_rx.try_write() {
                    let _ = rx.try_recv();
                }
                self.outbound_tx
                    .send(msg)
                    .await
                    .map_err(|e| ChatError::SendError(e.to_string()))
            }
            Err(e) => Err(ChatError::SendError(e.to_string())),
        }
    }

    pub async fn route_outbound(&self, message: OutboundMessage) -> Result<()> {
        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(&message.channel) {
            sender
                .send(message)
                .await
                .map_err(|e| ChatError::SendError(e.to_string()))
        } else {
            Err(ChatError::ChannelNotFound(message.channel))
        }
    }

    /// Routes one inbound message and queues the reply for its channel.
    pub async fn dispatch(&self, router: &MessageRouter, message: InboundMessage) -> Result<()> {
        let reply = router.handle(&message.sender_id, &message.text).await;
        let mut outbound = OutboundMessage::new(&message.channel, &message.sender_id, reply);
        if let Some(token) = message.reply_token {
            outbound = outbound.reply_to(token);
        }
        self.send_outbound(outbound).await
    }

    /// Processes messages until `shutdown` fires, then drains both queues.
    pub async fn run(
        &self,
        router: Arc<MessageRouter>,
        mut shutdown: mpsc::Receiver<()>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                Some(msg) = self.recv_inbound() => {
                    tracing::debug!(
                        channel = %msg.channel,
                        sender_id = %msg.sender_id,
                        "Received inbound message"
                    );
                    if let Err(e) = self.dispatch(&router, msg).await {
                        tracing::error!(error = %e, "Failed to queue reply");
                    }
                }
                Some(msg) = self.recv_outbound() => {
                    tracing::debug!(
                        channel = %msg.channel,
                        sender_id = %msg.sender_id,
                        "Routing outbound message"
                    );
                    if let Err(e) = self.route_outbound(msg).await {
                        tracing::error!(error = %e, "Failed to route outbound message");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("ChatHub received shutdown signal");
                    self.shutdown(&router).await?;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Answers whatever is still queued, then flushes replies to their channels.
    pub async fn shutdown(&self, router: &MessageRouter) -> Result<()> {
        tracing::info!("Draining ChatHub channels...");

        let pending: Vec<InboundMessage> = {
            let mut inbound_rx = self.inbound_rx.write().await;
            std::iter::from_fn(|| inbound_rx.try_recv().ok()).collect()
        };
        for msg in pending {
            tracing::debug!(sender_id = %msg.sender_id, "Answering drained inbound message");
            let _ = self.dispatch(router, msg).await;
        }

        let mut outbound_rx = self.outbound_rx.write().await;
        while let Ok(msg) = outbound_rx.try_recv() {
            tracing::debug!(
                channel = %msg.channel,
                sender_id = %msg.sender_id,
                "Drained outbound message"
            );
            let _ = self.route_outbound(msg).await;
        }

        tracing::info!("ChatHub shutdown complete");
        Ok(())
    }

    async fn recv_inbound(&self) -> Option<InboundMessage> {
        let mut rx = self.inbound_rx.write().await;
        rx.recv().await
    }

    async fn recv_outbound(&self) -> Option<OutboundMessage> {
        let mut rx = self.outbound_rx.write().await;
        rx.recv().await
    }
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}
