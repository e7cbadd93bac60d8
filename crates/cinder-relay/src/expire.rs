//! TTL expiry consumer.
//!
//! The countdown lives in the queue, not in a timer wheel: every
//! artifact's deletion job sits on the `out` queue and this loop keeps
//! re-judging whatever it fetches. A job whose time has come triggers a
//! delete against the owning service; one still in the future goes back
//! on the queue untouched and waits out another interval.
//!
//! Settlement order is what makes this safe on an at-least-once queue.
//! The fetched job is ACKed only after its outcome is secured: after
//! the delete attempt, or after the replacement copy is enqueued. A
//! crash between the two steps leaves a duplicate, never a lost job.

use std::time::Duration;

use cinder_core::{Clock, SweepAction, assess};
use cinder_proto::OUT_QUEUE;
use cinder_queue::{JobQueue, QueuedJob};
use cinder_remote::Deleter;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::Result;

/// Jobs fetched per poll iteration.
const FETCH_BATCH: usize = 1;

/// Polls the outbound queue and settles deletion jobs.
pub struct ExpiryConsumer<Q, D, C> {
    queue: Q,
    deleter: D,
    clock: C,
    poll_interval: Duration,
}

impl<Q, D, C> ExpiryConsumer<Q, D, C>
where
    Q: JobQueue,
    D: Deleter,
    C: Clock,
{
    /// Bundles the collaborators the expiry side needs.
    pub fn new(queue: Q, deleter: D, clock: C, poll_interval: Duration) -> Self {
        Self { queue, deleter, clock, poll_interval }
    }

    /// Runs until `shutdown` flips or the queue transport fails.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            queue = OUT_QUEUE,
            interval_secs = self.poll_interval.as_secs(),
            "expiry consumer started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.sweep_once().await?;
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
                _ = tokio::time::sleep(self.poll_interval) => {},
            }
        }
        info!("expiry consumer stopped");
        Ok(())
    }

    /// Fetches at most one job and settles it.
    ///
    /// The run loop calls this once per interval; tests call it
    /// directly to step the consumer without the clockwork.
    pub async fn sweep_once(&self) -> Result<()> {
        let jobs = self.queue.dequeue(&[OUT_QUEUE], FETCH_BATCH, false).await?;
        for job in jobs {
            self.settle(job).await?;
        }
        Ok(())
    }

    /// Decides and executes the fate of one fetched job.
    async fn settle(&self, job: QueuedJob) -> Result<()> {
        info!(job_id = %job.id, payload = %job.payload, "processing");
        match assess(&job.payload, self.clock.wall_clock_secs()) {
            SweepAction::Delete(deletion) => {
                info!(
                    job_id = %job.id,
                    kind = %deletion.kind,
                    artifact_id = %deletion.artifact_id,
                    "req-delete"
                );
                match self.deleter.destroy(deletion.kind, &deletion.artifact_id).await {
                    Ok(removed) => {
                        info!(
                            job_id = %job.id,
                            kind = %deletion.kind,
                            artifact_id = %deletion.artifact_id,
                            removed,
                            "status-delete"
                        );
                    },
                    // The artifact outlives its TTL; the job does not.
                    // Remote deletes are not retried.
                    Err(err) => {
                        warn!(
                            job_id = %job.id,
                            kind = %deletion.kind,
                            artifact_id = %deletion.artifact_id,
                            %err,
                            "status-delete"
                        );
                    },
                }
                self.queue.ack(&job.id).await?;
            },
            SweepAction::PushBack { remaining_secs } => {
                info!(job_id = %job.id, remaining_secs, "push-back");
                // Replacement first, then ACK: the payload is re-enqueued
                // verbatim so deferral can never rewrite a job.
                self.queue.enqueue(&job.queue, &job.payload).await?;
                self.queue.ack(&job.id).await?;
            },
            SweepAction::Drop(err) => {
                error!(job_id = %job.id, payload = %job.payload, %err, "drop-job");
                self.queue.ack(&job.id).await?;
            },
        }
        Ok(())
    }
}
