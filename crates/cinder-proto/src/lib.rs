//! Wire format for cinder deletion jobs.
//!
//! A deletion job is the unit of work on the `out` queue: "delete remote
//! artifact X once timestamp T has passed". The persisted representation is
//! deliberately primitive - three fields joined by `~` into one string, no
//! envelope, no schema version - because the queue transport only carries
//! opaque string payloads and peers on other stacks already speak this
//! format.
//!
//! Consumers decode payloads into [`DeletionJob`] at the queue boundary and
//! pass only the typed value onward; raw payload strings never cross into
//! decision or dispatch code.

pub mod error;
pub mod job;

pub use error::{PayloadError, Result};
pub use job::{ArtifactKind, DeletionJob};

/// Queue carrying inbound message notifications (post ids to ingest).
pub const IN_QUEUE: &str = "in";

/// Queue carrying deletion jobs for the expiry consumer.
pub const OUT_QUEUE: &str = "out";
