//! Expiry decision: what to do with one fetched deletion job.
//!
//! The driver loop in `cinder-relay` owns all I/O. It hands each fetched
//! payload to [`assess`] together with the current wall-clock second and gets
//! back a [`SweepAction`] telling it exactly which transport and artifact
//! calls to make. Raw payload strings stop here: everything past the decision
//! works on typed values.

use cinder_proto::{DeletionJob, PayloadError};

/// What the driver must do with the job it just fetched.
///
/// Every variant ends with the fetched job instance being acknowledged; the
/// variants differ only in what happens first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepAction {
    /// Expiry has passed: dispatch one delete call for the artifact, then
    /// ACK. The delete call's own failure does not change the ACK - deletion
    /// is attempted at most meaningfully-once per expiry decision.
    Delete(DeletionJob),

    /// Not yet due: enqueue an identical payload onto the same queue, then
    /// ACK the original instance.
    ///
    /// The transport has no delayed delivery and its NACK redelivers
    /// immediately, which hot-loops on far-future jobs; re-enqueueing parks
    /// the job at the back of the queue for a full poll cycle instead.
    PushBack {
        /// Seconds until the job becomes due, for the push-back log line.
        remaining_secs: u64,
    },

    /// Permanently malformed payload (bad shape, non-integer expiry, or an
    /// unknown kind tag): ACK without any delete call and log. Never retried,
    /// because the payload cannot become valid by waiting.
    Drop(PayloadError),
}

/// Decide the fate of one fetched payload at wall-clock second `now_unix`.
///
/// The expiry boundary is inclusive: `expires_at == now_unix` is due.
#[must_use]
pub fn assess(payload: &str, now_unix: u64) -> SweepAction {
    match payload.parse::<DeletionJob>() {
        Err(err) => SweepAction::Drop(err),
        Ok(job) if job.is_expired(now_unix) => SweepAction::Delete(job),
        Ok(job) => SweepAction::PushBack { remaining_secs: job.remaining_secs(now_unix) },
    }
}
