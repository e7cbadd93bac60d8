//! Publish flow: encrypt, sign, store, announce, schedule deletion.

use cinder_core::{Clock as _, SystemClock};
use cinder_proto::{ArtifactKind, DeletionJob, OUT_QUEUE};
use cinder_queue::JobQueue;
use cinder_remote::{Agent, MicroblogClient, PasteClient};
use tracing::{error, info};

use crate::error::{RelayError, Result};

/// Pastes are unlisted rather than listed; their ids travel only inside
/// the micro-blog announcement.
const PUBLIC_PASTES: bool = false;

/// Ids of the two artifacts one push leaves behind.
#[derive(Debug, Clone)]
pub struct PushOutcome {
    /// Paste holding the sealed message.
    pub paste_id: String,
    /// Post announcing the paste.
    pub post_id: String,
}

/// Sends one message through the bus.
pub struct Publisher<Q> {
    agent: Agent,
    paste: PasteClient,
    microblog: MicroblogClient,
    queue: Q,
    clock: SystemClock,
}

impl<Q: JobQueue> Publisher<Q> {
    /// Bundles the collaborators one push needs.
    pub fn new(agent: Agent, paste: PasteClient, microblog: MicroblogClient, queue: Q) -> Self {
        Self { agent, paste, microblog, queue, clock: SystemClock::new() }
    }

    /// Publishes `message` to `recipient` with a lifetime of `ttl_secs`.
    ///
    /// The message is encrypted to the recipient, signed by the sender,
    /// stored as a paste, and announced with a post carrying the paste
    /// id. Both artifacts get a deletion job with the same expiry;
    /// `ttl_secs` of zero schedules nothing and the artifacts stay up.
    ///
    /// Failing to enqueue a deletion job does not fail the push: the
    /// message is already out, so the loss is logged and accepted.
    pub async fn push(&self, message: &str, recipient: &str, ttl_secs: u64) -> Result<PushOutcome> {
        if !self.agent.status().await? {
            return Err(RelayError::NotLoggedIn);
        }
        if !self.agent.lookup(recipient).await? {
            return Err(RelayError::UntrustedRecipient(recipient.to_string()));
        }

        let sealed = self.agent.encrypt(message, recipient).await?;
        let signed = self.agent.sign(&sealed).await?;

        let paste_id = self
            .paste
            .create(&signed, recipient, PUBLIC_PASTES)
            .await?
            .ok_or(RelayError::PasteRefused)?;
        let expires_at = self.clock.wall_clock_secs().saturating_add(ttl_secs);
        if ttl_secs > 0 {
            schedule_expiry(&self.queue, ArtifactKind::Paste, &paste_id, expires_at).await;
        }

        let post_id = self.microblog.publish(&paste_id).await?;
        if ttl_secs > 0 {
            schedule_expiry(&self.queue, ArtifactKind::Post, &post_id, expires_at).await;
        }

        Ok(PushOutcome { paste_id, post_id })
    }
}

/// Enqueues a deletion job for one artifact.
///
/// Never fails the caller: a job that cannot be encoded or enqueued is
/// logged and dropped, leaving the artifact to outlive its TTL.
pub async fn schedule_expiry<Q: JobQueue>(
    queue: &Q,
    kind: ArtifactKind,
    artifact_id: &str,
    expires_at: u64,
) {
    let job = match DeletionJob::new(kind, artifact_id, expires_at) {
        Ok(job) => job,
        Err(err) => {
            error!(kind = %kind, artifact_id = %artifact_id, %err, "queue-error");
            return;
        },
    };
    match queue.enqueue(OUT_QUEUE, &job.payload()).await {
        Ok(job_id) => {
            info!(
                job_id = %job_id,
                kind = %kind,
                artifact_id = %artifact_id,
                expires_at,
                "job-queued"
            );
        },
        Err(err) => {
            error!(kind = %kind, artifact_id = %artifact_id, %err, "queue-error");
        },
    }
}
