//! External collaborators for the cinder message bus.
//!
//! Everything that talks to the outside world lives here: the
//! credential vault, the paste and micro-blog HTTP clients, the local
//! secure-messaging agent, and the dispatch seams the relay loops
//! depend on instead of the concrete clients ([`Deleter`] for the
//! expiry side, [`Opener`] for the ingest side).

pub mod agent;
pub mod dispatch;
pub mod error;
pub mod microblog;
mod oauth;
pub mod paste;
pub mod vault;

pub use agent::{Agent, DEFAULT_AGENT_PROGRAM, Opened, Verification};
pub use dispatch::{Deleter, Opener, RemoteDeleter, RemoteOpener};
pub use error::{RemoteError, Result};
pub use microblog::{DEFAULT_MICROBLOG_URL, MicroblogClient, TimelinePost};
pub use paste::{DEFAULT_PASTE_URL, PasteClient};
pub use vault::{MicroblogKeys, Vault};
