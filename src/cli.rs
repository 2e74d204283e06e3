use crate::chat::Reply;
use crate::config::{self, Config};
use crate::gateway;
use crate::router::FixedClock;
use crate::session::SessionManager;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "trashday")]
#[command(about = "trashday - garbage collection day assistant for LINE")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable verbose (DEBUG) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display version information
    Version,

    /// Run the LINE webhook server
    Serve {
        /// Address to bind, e.g. 0.0.0.0:5000
        #[arg(long)]
        bind: Option<String>,

        /// Path to config.json
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Answer one message locally and print the reply
    Ask {
        /// Message text, exactly as a user would send it
        text: String,

        /// Sender id to register the session under
        #[arg(long, default_value = "local")]
        sender: String,

        /// Pretend today is this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Path to config.json
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init {
        /// Path to config.json
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Version) => {
            print_version();
            Ok(())
        }
        Some(Commands::Serve { bind, config }) => {
            let config = config::load_config(bind, config)?;
            runtime()?.block_on(gateway::run_gateway(&config))
        }
        Some(Commands::Ask {
            text,
            sender,
            date,
            config,
        }) => {
            let config = config::load_config(None, config)?;
            let reply = runtime()?.block_on(ask(&config, &sender, &text, date))?;
            println!("{}", render_reply(&reply)?);
            Ok(())
        }
        Some(Commands::Init { config, force }) => init(config, force),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")
}

async fn ask(config: &Config, sender: &str, text: &str, date: Option<NaiveDate>) -> Result<Reply> {
    let sessions = Arc::new(SessionManager::new(config.session_capacity));
    let mut router = gateway::build_message_router(config, sessions)?;
    if let Some(date) = date {
        router = router.with_clock(Arc::new(FixedClock(date)));
    }
    Ok(router.handle(sender, text).await)
}

fn render_reply(reply: &Reply) -> crate::utils::Result<String> {
    Ok(match reply {
        Reply::Text { text } => text.clone(),
        Reply::Image { content_url, .. } => content_url.clone(),
        Reply::Template { alt_text, payload } => {
            format!("{}\n{}", alt_text, serde_json::to_string_pretty(payload)?)
        }
    })
}

fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path.or_else(config::get_config_path) {
        Some(path) => path,
        None => bail!("Could not determine home directory for config.json"),
    };

    if path.exists() && !force {
        bail!(
            "Config file {} already exists. Use --force to overwrite it.",
            path.display()
        );
    }

    config::save_config(&Config::default(), &path)?;
    println!("Wrote {}", path.display());
    println!("Set channel_access_token and channel_secret before running 'trashday serve'.");
    Ok(())
}

fn print_version() {
    println!("trashday {}", env!("CARGO_PKG_VERSION"));
}
