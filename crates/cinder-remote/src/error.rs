//! Error types for remote collaborators.

use thiserror::Error;

/// Result alias for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors from the credential vault, the hosted services, or the local agent.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The vault file could not be read.
    #[error("unable to read credential vault {path}: {detail}")]
    VaultIo {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O failure.
        detail: String,
    },

    /// The vault file is not valid JSON or is missing required fields.
    #[error("credential vault {path} is malformed: {detail}")]
    VaultFormat {
        /// Path that was read.
        path: String,
        /// Parse failure.
        detail: String,
    },

    /// An HTTP request failed before a response arrived.
    #[error("http request failed: {0}")]
    Http(String),

    /// A service refused an operation outright.
    #[error("{service} {operation} returned status {status}")]
    Service {
        /// Which service answered.
        service: &'static str,
        /// Operation that was refused.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
    },

    /// A service responded with a body we could not interpret.
    #[error("{service} response is malformed: {detail}")]
    Response {
        /// Which service answered.
        service: &'static str,
        /// What was wrong with the body.
        detail: String,
    },

    /// The agent binary could not be started.
    #[error("unable to run agent: {0}")]
    AgentSpawn(String),

    /// The agent ran but reported failure.
    #[error("agent {operation} failed: {detail}")]
    Agent {
        /// Subcommand that failed.
        operation: &'static str,
        /// Agent's own diagnostic, ANSI-stripped.
        detail: String,
    },
}
