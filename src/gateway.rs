//! Gateway daemon for trashday
//!
//! The gateway owns the session map, the router, the ChatHub and the LINE
//! channel, and tears them down in order on SIGTERM/SIGINT.

use crate::assets::{AssetStore, CalendarImage, TemplateAsset};
use crate::channels::{Channel, LINE_CHANNEL_NAME, LineChannel, LineSettings};
use crate::chat::ChatHub;
use crate::config::Config;
use crate::router::MessageRouter;
use crate::schedule::Schedule;
use crate::session::SessionManager;
use crate::utils::TrashdayError;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads the configured assets. Template files are loaded once, here.
pub fn load_assets(config: &Config) -> Result<AssetStore> {
    let calendar = CalendarImage {
        content_url: config.calendar_image_url.clone(),
        preview_url: config.calendar_preview().to_string(),
    };
    let mut assets = AssetStore::new(calendar);

    if let Some(path) = &config.template_path {
        let template =
            TemplateAsset::load(&config.template_keyword, &config.template_alt_text, path)
                .with_context(|| format!("Failed to load template {}", path.display()))?;
        info!(keyword = %template.keyword, "Template asset loaded");
        assets = assets.with_template(template);
    }

    Ok(assets)
}

/// Builds a router over the default weekly table for the configured month.
pub fn build_message_router(
    config: &Config,
    sessions: Arc<SessionManager>,
) -> Result<MessageRouter> {
    let assets = load_assets(config)?;
    Ok(MessageRouter::new(
        Schedule::default(),
        config.reference_month,
        assets,
        sessions,
    ))
}

fn line_settings(config: &Config) -> Result<LineSettings> {
    let channel_access_token = config.channel_access_token.clone().ok_or_else(|| {
        TrashdayError::config(
            "LINE channel access token is not configured. Set LINE_CHANNEL_ACCESS_TOKEN or add channel_access_token to config.json",
        )
    })?;
    let channel_secret = config.channel_secret.clone().ok_or_else(|| {
        TrashdayError::config(
            "LINE channel secret is not configured. Set LINE_CHANNEL_SECRET or add channel_secret to config.json",
        )
    })?;

    Ok(LineSettings {
        channel_access_token,
        channel_secret,
        bind_addr: config.bind_addr.clone(),
        api_base: config.api_base.clone(),
    })
}

/// Runs the gateway until SIGTERM/SIGINT, then shuts down gracefully.
pub async fn run_gateway(config: &Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting trashday gateway"
    );

    let settings = line_settings(config)?;

    let sessions = Arc::new(SessionManager::with_ttl(
        config.session_capacity,
        chrono::Duration::days(config.session_ttl_days),
    ));
    let router = Arc::new(build_message_router(config, Arc::clone(&sessions))?);
    info!(
        reference_month = %config.reference_month,
        session_capacity = sessions.capacity(),
        "Message router initialized"
    );

    let (cleanup_handle, cleanup_shutdown) = sessions.start_cleanup_task();
    info!("Session cleanup background task started");

    let hub = Arc::new(ChatHub::new());

    let line = LineChannel::new(settings).context("Invalid LINE channel settings")?;
    line.start(Arc::clone(&hub))
        .await
        .context("Failed to start LINE channel")?;

    let (hub_shutdown, hub_shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let hub_handle: JoinHandle<()> = {
        let hub = Arc::clone(&hub);
        let router = Arc::clone(&router);
        tokio::spawn(async move {
            if let Err(e) = hub.run(router, hub_shutdown_rx).await {
                error!("ChatHub error: {}", e);
            }
        })
    };

    info!("Gateway is running. Press Ctrl+C to stop.");

    wait_for_signal().await;

    info!("Starting graceful shutdown sequence...");

    if let Err(e) = line.shutdown().await {
        error!("Error shutting down LINE channel: {}", e);
    }

    let _ = cleanup_shutdown.send(()).await;
    await_task("Cleanup", cleanup_handle).await;

    let _ = hub_shutdown.send(()).await;
    await_task("ChatHub", hub_handle).await;

    // Replies answered during the hub drain are still queued for LINE
    hub.unregister_channel(LINE_CHANNEL_NAME).await;
    if let Some(delivery) = line.take_delivery_task().await {
        await_task("LINE delivery", delivery).await;
    }

    info!(
        sessions = sessions.session_count().await,
        "Gateway stopped gracefully"
    );
    Ok(())
}

async fn await_task(name: &str, handle: JoinHandle<()>) {
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
        Ok(Ok(())) => info!("{} task completed gracefully", name),
        Ok(Err(e)) => error!("{} task panicked: {}", name, e),
        Err(_) => error!("{} task did not complete within 5s timeout", name),
    }
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to install signal handlers: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown..."),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown..."),
        }
    }
    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    }
}
