//! Ingest flow: receive, fetch, verify, decrypt, deliver.

use std::time::Duration;

use cinder_proto::IN_QUEUE;
use cinder_queue::{JobQueue, QueuedJob};
use cinder_remote::Opener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{RelayError, Result};

/// Jobs fetched per poll iteration.
const FETCH_BATCH: usize = 1;

/// Polls the inbound queue and opens whatever arrives.
///
/// Delivery is best effort: each job is ACKed on receipt, then every
/// later failure (missing paste, bad signature, foreign ciphertext) is
/// logged and the message is gone. Only queue transport failures stop
/// the loop.
pub struct IngestConsumer<Q, O> {
    queue: Q,
    opener: O,
    poll_interval: Duration,
}

impl<Q, O> IngestConsumer<Q, O>
where
    Q: JobQueue,
    O: Opener,
{
    /// Bundles the collaborators the inbound side needs.
    pub fn new(queue: Q, opener: O, poll_interval: Duration) -> Self {
        Self { queue, opener, poll_interval }
    }

    /// Runs until `shutdown` flips or the queue transport fails.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        if !self.opener.status().await? {
            return Err(RelayError::NotLoggedIn);
        }
        info!(queue = IN_QUEUE, interval_secs = self.poll_interval.as_secs(), "ingest started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.receive_once().await?;
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
                _ = tokio::time::sleep(self.poll_interval) => {},
            }
        }
        info!("ingest stopped");
        Ok(())
    }

    /// Fetches at most one inbound job and opens it.
    pub async fn receive_once(&self) -> Result<()> {
        let jobs = self.queue.dequeue(&[IN_QUEUE], FETCH_BATCH, false).await?;
        for job in jobs {
            // ACK before opening: receipt settles the job, whatever
            // the message turns out to be.
            self.queue.ack(&job.id).await?;
            self.open(&job).await;
        }
        Ok(())
    }

    /// Opens one message end to end. Failures are logged, never returned.
    async fn open(&self, job: &QueuedJob) {
        let artifact_id = job.payload.trim();

        let blob = match self.opener.fetch(artifact_id).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                warn!(artifact_id = %artifact_id, "message paste missing");
                return;
            },
            Err(err) => {
                warn!(artifact_id = %artifact_id, %err, "message fetch failed");
                return;
            },
        };

        let verification = match self.opener.verify(&blob).await {
            Ok(verification) => verification,
            Err(err) => {
                warn!(artifact_id = %artifact_id, %err, "signature check failed");
                return;
            },
        };
        if !verification.ok {
            warn!(artifact_id = %artifact_id, "unsigned or tampered message dropped");
            return;
        }

        let opened = match self.opener.decrypt(&verification.inner_text).await {
            Ok(opened) => opened,
            Err(err) => {
                warn!(artifact_id = %artifact_id, %err, "message not addressed to us");
                return;
            },
        };

        let author = opened.author.as_deref().unwrap_or("<unsigned>");
        info!(
            artifact_id = %artifact_id,
            author = %author,
            signer = ?verification.signer,
            message = %opened.plaintext,
            "message-in"
        );
    }
}
