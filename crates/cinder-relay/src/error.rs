//! Relay-level errors.
//!
//! The taxonomy is two-sided: queue transport failures are fatal and
//! bubble out of the consumer loops, while per-message and per-artifact
//! failures are logged where they happen and never carried this far.

use cinder_queue::QueueError;
use cinder_remote::RemoteError;
use thiserror::Error;

/// Result alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Fatal errors of the host process.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The queue transport failed. Always fatal; supervision restarts us.
    #[error("queue transport: {0}")]
    Queue(#[from] QueueError),

    /// A remote collaborator failed in a way the flow cannot absorb.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The agent has no logged-in user.
    #[error("agent has no logged-in user")]
    NotLoggedIn,

    /// The recipient failed the agent's identity check.
    #[error("recipient {0} failed identity verification")]
    UntrustedRecipient(String),

    /// The paste service refused to store the message.
    #[error("paste service declined the upload")]
    PasteRefused,

    /// Neither `--message` nor `--file` was given.
    #[error("either --message or --file is required")]
    NoMessage,

    /// The message file could not be read.
    #[error("unable to read message file {path}: {detail}")]
    MessageFile {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O failure.
        detail: String,
    },

    /// The message file is not text.
    #[error("message file {path} is not UTF-8 text")]
    NotText {
        /// Path that was read.
        path: String,
    },
}
