//! LINE Messaging API channel.
//!
//! Inbound: an axum server receiving signed webhooks on `/callback`.
//! Outbound: replies through the reply API using the event's reply token.

pub mod client;
pub mod webhook;

use crate::channels::Channel;
use crate::chat::{ChatHub, OutboundMessage};
use crate::utils::{SignatureVerifier, TrashdayError, log_error};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;

pub use client::{DEFAULT_API_BASE, LineClient, to_line_message};
pub use webhook::{WebhookError, WebhookState, build_router};

pub const LINE_CHANNEL_NAME: &str = "line";

/// Connection settings for the LINE channel.
#[derive(Debug, Clone)]
pub struct LineSettings {
    pub channel_access_token: String,
    pub channel_secret: String,
    pub bind_addr: String,
    pub api_base: String,
}

pub struct LineChannel {
    settings: LineSettings,
    client: LineClient,
    local_addr: Arc<RwLock<Option<SocketAddr>>>,
    shutdown_tx: Arc<RwLock<Option<mpsc::Sender<()>>>>,
    delivery: Mutex<Option<JoinHandle<()>>>,
}

impl LineChannel {
    pub fn new(settings: LineSettings) -> Result<Self> {
        if settings.channel_access_token.trim().is_empty() {
            bail!("LINE channel access token is empty");
        }
        if settings.channel_secret.trim().is_empty() {
            bail!("LINE channel secret is empty");
        }

        let client = LineClient::new(&settings.channel_access_token, &settings.api_base)
            .context("Failed to build LINE API client")?;

        Ok(Self {
            settings,
            client,
            local_addr: Arc::new(RwLock::new(None)),
            shutdown_tx: Arc::new(RwLock::new(None)),
            delivery: Mutex::new(None),
        })
    }

    /// The address the webhook server is listening on, once started.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read().await
    }

    /// Stops the webhook server gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(()).await;
            tracing::info!("LINE channel shutdown signal sent");
        }
        Ok(())
    }

    /// Hands over the outbound delivery task. It finishes once the hub has
    /// dropped this channel's queue and every queued reply has been sent.
    pub async fn take_delivery_task(&self) -> Option<JoinHandle<()>> {
        self.delivery.lock().await.take()
    }

    async fn deliver(client: &LineClient, message: OutboundMessage) -> Result<()> {
        let Some(token) = message.reply_token.as_deref() else {
            return Err(TrashdayError::channel(format!(
                "No reply token for message to {}; push messages are not supported",
                message.sender_id
            ))
            .into());
        };

        client
            .reply(token, std::slice::from_ref(&message.reply))
            .await
            .with_context(|| format!("Failed to reply to {}", message.sender_id))?;

        tracing::debug!(sender_id = %message.sender_id, "Delivered LINE reply");
        Ok(())
    }
}

#[async_trait]
impl Channel for LineChannel {
    async fn start(&self, hub: Arc<ChatHub>) -> Result<()> {
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundMessage>(100);
        hub.register_channel(LINE_CHANNEL_NAME, outbound_tx).await?;

        let listener = tokio::net::TcpListener::bind(&self.settings.bind_addr)
            .await
            .with_context(|| format!("Failed to bind webhook server to {}", self.settings.bind_addr))?;
        let addr = listener.local_addr()?;
        *self.local_addr.write().await = Some(addr);

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.write().await = Some(shutdown_tx);

        let app = build_router(WebhookState {
            verifier: SignatureVerifier::new(&self.settings.channel_secret),
            hub,
        });

        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await;
            match result {
                Ok(()) => tracing::info!("LINE webhook server stopped"),
                Err(e) => tracing::error!(error = %e, "LINE webhook server failed"),
            }
        });

        let client = self.client.clone();
        let delivery = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = Self::deliver(&client, message).await {
                    log_error("Failed to send outbound message", &e);
                }
            }
            tracing::info!("LINE outbound handler stopped");
        });
        *self.delivery.lock().await = Some(delivery);

        tracing::info!(addr = %addr, "LINE webhook listening on /callback");
        Ok(())
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        Self::deliver(&self.client, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Reply;

    fn settings() -> LineSettings {
        LineSettings {
            channel_access_token: "token".to_string(),
            channel_secret: "secret".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
        }
    }

    #[test]
    fn test_requires_credentials() {
        let mut missing_token = settings();
        missing_token.channel_access_token = " ".to_string();
        assert!(LineChannel::new(missing_token).is_err());

        let mut missing_secret = settings();
        missing_secret.channel_secret = String::new();
        assert!(LineChannel::new(missing_secret).is_err());

        assert!(LineChannel::new(settings()).is_ok());
    }

    #[tokio::test]
    async fn test_send_without_reply_token_fails() {
        let channel = LineChannel::new(settings()).unwrap();
        let result = channel
            .send(OutboundMessage::new(LINE_CHANNEL_NAME, "U1", Reply::text("hi")))
            .await;
        assert!(result.unwrap_err().to_string().contains("No reply token"));
    }

    #[tokio::test]
    async fn test_start_binds_and_registers() {
        let channel = LineChannel::new(settings()).unwrap();
        let hub = Arc::new(ChatHub::new());
        channel.start(Arc::clone(&hub)).await.unwrap();

        let addr = channel.local_addr().await.unwrap();
        assert_ne!(addr.port(), 0);

        // Registered: routing no longer fails with ChannelNotFound
        let routed = hub
            .route_outbound(OutboundMessage::new(LINE_CHANNEL_NAME, "U1", Reply::text("x")))
            .await;
        assert!(routed.is_ok());

        channel.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_delivery_task_ends_when_unregistered() {
        let channel = LineChannel::new(settings()).unwrap();
        let hub = Arc::new(ChatHub::new());
        channel.start(Arc::clone(&hub)).await.unwrap();

        let delivery = channel.take_delivery_task().await.unwrap();
        assert!(channel.take_delivery_task().await.is_none());

        hub.unregister_channel(LINE_CHANNEL_NAME).await;
        tokio::time::timeout(std::time::Duration::from_secs(5), delivery)
            .await
            .unwrap()
            .unwrap();

        channel.shutdown().await.unwrap();
    }
}
