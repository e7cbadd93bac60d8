//! The queue transport seam: job identity, delivered jobs, and the
//! [`JobQueue`] trait every transport implementation satisfies.

use std::{collections::BTreeMap, fmt};

use async_trait::async_trait;

use crate::error::QueueError;

/// Opaque job identifier assigned by the transport at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Wrap a transport-assigned id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string as the transport knows it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One delivered job: where it came from, its id, and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    /// Name of the queue the job was fetched from.
    pub queue: String,
    /// Transport-assigned job id, used for ACK/NACK/delete.
    pub id: JobId,
    /// Opaque string payload exactly as enqueued.
    pub payload: String,
}

/// At-least-once job queue with explicit acknowledgment.
///
/// # Invariants
///
/// - Ownership: a dequeued job is delivered to exactly one caller until it is
///   ACKed or its lease expires on the server. Implementations must never
///   hand the same delivery to two concurrent callers.
/// - At-least-once: a job may be redelivered (after NACK or lease expiry);
///   consumers must treat their effects as idempotent.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a job to a named queue, returning the transport-assigned id.
    async fn enqueue(&self, queue: &str, payload: &str) -> Result<JobId, QueueError>;

    /// Fetch up to `count` jobs from the named queues, in queue order.
    ///
    /// With `blocking` the call waits until at least one job is available;
    /// otherwise an empty queue yields an empty vec immediately.
    async fn dequeue(
        &self,
        queues: &[&str],
        count: usize,
        blocking: bool,
    ) -> Result<Vec<QueuedJob>, QueueError>;

    /// Acknowledge a delivered job, removing it permanently.
    async fn ack(&self, id: &JobId) -> Result<(), QueueError>;

    /// Negatively acknowledge a delivered job: return it to its queue for
    /// prompt redelivery.
    async fn nack(&self, id: &JobId) -> Result<(), QueueError>;

    /// Hard-delete a job wherever it currently is (pending or delivered).
    async fn delete_job(&self, id: &JobId) -> Result<(), QueueError>;

    /// Diagnostic key/value snapshot of the transport's state.
    async fn info(&self) -> Result<BTreeMap<String, String>, QueueError>;
}
