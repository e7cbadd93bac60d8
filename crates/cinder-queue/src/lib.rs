//! Queue transport adapter for the cinder message bus.
//!
//! The bus runs on a disque-compatible job server: named queues, at-least-once
//! delivery, explicit ACK/NACK, hard delete by job id. This crate exposes that
//! contract as the [`JobQueue`] trait and ships two implementations:
//!
//! - [`DisqueClient`] - the production client, speaking the RESP wire protocol
//!   over TCP to one node of a disque-compatible server.
//! - [`MemoryQueue`] - an in-process twin with the same observable semantics,
//!   used by integration tests and local experiments.
//!
//! Consumers rely on the transport's ownership guarantee: a dequeued job
//! belongs to one consumer until it is ACKed or its lease times out. That
//! guarantee is the bus's only coordination mechanism, so both implementations
//! must preserve it.

pub mod disque;
pub mod error;
pub mod memory;
pub mod queue;
pub mod resp;

pub use disque::DisqueClient;
pub use error::QueueError;
pub use memory::MemoryQueue;
pub use queue::{JobId, JobQueue, QueuedJob};
