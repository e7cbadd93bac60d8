//! Queue transport error types.
//!
//! Consumers treat every variant here as transport-fatal: the run loop aborts
//! and an external supervisor restarts the process. Unacked jobs survive via
//! the server's lease timeout, so aborting is always safe.

use std::io;

use thiserror::Error;

/// Errors from the queue transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// No configured endpoint accepted a connection.
    #[error("unable to reach any queue endpoint: {detail}")]
    Connect {
        /// Last connection failure, or a note that no endpoints were given.
        detail: String,
    },

    /// Network I/O failed mid-command.
    #[error("queue transport I/O error: {0}")]
    Io(String),

    /// The server's reply violated the wire protocol.
    #[error("queue protocol error: {0}")]
    Protocol(String),

    /// The server answered a command with an error reply.
    #[error("queue server error: {0}")]
    Server(String),

    /// Job id not present in the queue (in-memory implementation only; the
    /// wire server treats unknown ids as no-ops).
    #[error("unknown job id: {0}")]
    UnknownJob(String),
}

impl From<io::Error> for QueueError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
