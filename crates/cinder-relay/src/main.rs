//! cinder binary.
//!
//! # Usage
//!
//! ```bash
//! # Send a message that deletes itself after an hour
//! cinder push --recipient zyx --ttl 3600 --message "meet at noon"
//!
//! # Run the expiry consumer against two brokers
//! cinder -s q1.internal:7711 -s q2.internal:7711 expire
//!
//! # Watch an account's timeline and feed the inbound queue
//! cinder watch --account zyx
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use cinder_core::SystemClock;
use cinder_queue::{DisqueClient, JobQueue};
use cinder_relay::{
    DEFAULT_POLL_INTERVAL_SECS, ExpiryConsumer, IngestConsumer, Publisher, RelayConfig, RelayError,
    Watcher,
};
use cinder_remote::{Agent, MicroblogClient, PasteClient, RemoteDeleter, RemoteOpener, Vault};
use clap::{ArgGroup, Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `--debug` is set; `RUST_LOG` still wins.
const DEBUG_FILTER: &str =
    "info,cinder_relay=debug,cinder_remote=debug,cinder_queue=debug,cinder_core=debug";

/// Store-and-forward encrypted message bus
#[derive(Parser, Debug)]
#[command(name = "cinder")]
#[command(about = "Store-and-forward encrypted message bus")]
#[command(version)]
struct Args {
    /// Queue broker endpoint (host:port); repeat for fallbacks
    #[arg(short = 's', long = "socket", default_value = "localhost:7711")]
    socket: Vec<String>,

    /// Seconds between consumer poll iterations
    #[arg(short = 'r', long = "interval", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    interval: u64,

    /// Verbose logging for cinder crates
    #[arg(short, long)]
    debug: bool,

    /// Path to the credential vault
    #[arg(long, default_value = Vault::DEFAULT_PATH)]
    vault: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encrypt, sign, and send a message
    #[command(group(ArgGroup::new("source").required(true).args(["message", "file"])))]
    Push {
        /// Recipient identity on the agent's network
        #[arg(long)]
        recipient: String,

        /// Message lifetime in seconds; zero leaves the artifacts up
        #[arg(long, default_value_t = 0)]
        ttl: u64,

        /// Message text
        #[arg(long)]
        message: Option<String>,

        /// Read the message from a UTF-8 text file instead
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Receive and log inbound messages
    Pull,
    /// Run the TTL expiry consumer
    Expire,
    /// Watch micro-blog accounts and feed the inbound queue
    Watch {
        /// Account to watch; repeatable
        #[arg(long = "account", required = true)]
        account: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_filter = if args.debug { DEBUG_FILTER } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = RelayConfig {
        endpoints: args.socket,
        poll_interval: Duration::from_secs(args.interval),
        vault_path: args.vault,
    };

    run(config, args.command).await?;
    Ok(())
}

async fn run(config: RelayConfig, command: Command) -> Result<(), RelayError> {
    let vault = Vault::load(&config.vault_path)?;
    let queue = DisqueClient::connect(&config.endpoints).await?;
    let snapshot = queue.info().await?;
    tracing::info!(endpoint = queue.endpoint(), snapshot = ?snapshot, "queue-init");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    match command {
        Command::Push { recipient, ttl, message, file } => {
            let text = message_text(message, file.as_deref())?;
            let publisher = Publisher::new(
                Agent::new(),
                PasteClient::new(vault.paste_token)?,
                MicroblogClient::new(vault.microblog)?,
                queue,
            );
            let outcome = publisher.push(&text, &recipient, ttl).await?;
            tracing::info!(
                paste_id = %outcome.paste_id,
                post_id = %outcome.post_id,
                "message published"
            );
        },
        Command::Pull => {
            let opener = RemoteOpener::new(PasteClient::new(vault.paste_token)?, Agent::new());
            let consumer = IngestConsumer::new(queue, opener, config.poll_interval);
            report(consumer.run(shutdown_rx).await)?;
        },
        Command::Expire => {
            let deleter = RemoteDeleter::new(
                PasteClient::new(vault.paste_token)?,
                MicroblogClient::new(vault.microblog)?,
            );
            let consumer =
                ExpiryConsumer::new(queue, deleter, SystemClock::new(), config.poll_interval);
            report(consumer.run(shutdown_rx).await)?;
        },
        Command::Watch { account } => {
            let watcher = Watcher::new(
                queue,
                MicroblogClient::new(vault.microblog)?,
                account,
                config.poll_interval,
            );
            report(watcher.run(shutdown_rx).await)?;
        },
    }
    Ok(())
}

/// Tags fatal transport failures before they unwind to `main`.
fn report(outcome: Result<(), RelayError>) -> Result<(), RelayError> {
    if let Err(RelayError::Queue(err)) = &outcome {
        tracing::error!(%err, "queue-error");
    }
    outcome
}

fn message_text(message: Option<String>, file: Option<&Path>) -> Result<String, RelayError> {
    if let Some(text) = message {
        return Ok(text);
    }
    let Some(path) = file else {
        return Err(RelayError::NoMessage);
    };
    let bytes = std::fs::read(path).map_err(|err| RelayError::MessageFile {
        path: path.display().to_string(),
        detail: err.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|_| RelayError::NotText { path: path.display().to_string() })
}
