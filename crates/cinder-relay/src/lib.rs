//! Host process of the cinder message bus.
//!
//! Four flows share one queue transport and one credential vault:
//!
//! - [`publish::Publisher`] seals and sends a message, scheduling
//!   deletion of everything it leaves behind.
//! - [`ingest::IngestConsumer`] opens whatever the inbound queue holds.
//! - [`expire::ExpiryConsumer`] settles deletion jobs when their time
//!   comes, deferring the ones that are still fresh.
//! - [`watch::Watcher`] turns watched timelines into inbound jobs.
//!
//! The `cinder` binary wires these to the CLI, one flow per subcommand.

pub mod config;
pub mod error;
pub mod expire;
pub mod ingest;
pub mod publish;
pub mod watch;

pub use config::{DEFAULT_POLL_INTERVAL_SECS, RelayConfig};
pub use error::{RelayError, Result};
pub use expire::ExpiryConsumer;
pub use ingest::IngestConsumer;
pub use publish::{Publisher, PushOutcome, schedule_expiry};
pub use watch::Watcher;
