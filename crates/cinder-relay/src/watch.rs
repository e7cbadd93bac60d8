//! Timeline watcher: feeds announced paste ids onto the inbound queue.

use std::collections::HashMap;
use std::time::Duration;

use cinder_proto::IN_QUEUE;
use cinder_queue::JobQueue;
use cinder_remote::{MicroblogClient, TimelinePost};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};

/// Polls watched accounts' timelines and turns every fresh post into an
/// inbound job, the post text being the announced paste id.
///
/// The first poll of each account only primes a high-water mark, so a
/// freshly started watcher never replays an account's history.
pub struct Watcher<Q> {
    queue: Q,
    microblog: MicroblogClient,
    accounts: Vec<String>,
    poll_interval: Duration,
}

impl<Q: JobQueue> Watcher<Q> {
    /// Bundles the collaborators the watcher needs.
    pub fn new(
        queue: Q,
        microblog: MicroblogClient,
        accounts: Vec<String>,
        poll_interval: Duration,
    ) -> Self {
        Self { queue, microblog, accounts, poll_interval }
    }

    /// Runs until `shutdown` flips or the queue transport fails.
    ///
    /// Timeline failures are transient: logged, the account retried next
    /// interval. Queue failures are fatal like in every consumer.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(accounts = ?self.accounts, interval_secs = self.poll_interval.as_secs(), "start-watch");
        let mut marks: HashMap<String, u64> = HashMap::new();
        loop {
            if *shutdown.borrow() {
                break;
            }
            for account in &self.accounts {
                match self.poll_account(account, &mut marks).await {
                    Ok(()) => {},
                    Err(err @ RelayError::Queue(_)) => return Err(err),
                    Err(err) => warn!(account = %account, %err, "timeline poll failed"),
                }
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
                _ = tokio::time::sleep(self.poll_interval) => {},
            }
        }
        info!("stop-watch");
        Ok(())
    }

    async fn poll_account(&self, account: &str, marks: &mut HashMap<String, u64>) -> Result<()> {
        let mark = marks.get(account).copied();
        let posts = self.microblog.timeline(account, mark).await?;

        let (fresh, next_mark) = fresh_posts(&posts, mark);
        for post in fresh {
            let job_id = self.queue.enqueue(IN_QUEUE, post.text.trim()).await?;
            debug!(account = %account, post_id = post.id, job_id = %job_id, "inbound message queued");
        }
        if let Some(next) = next_mark {
            if mark != Some(next) {
                debug!(account = %account, mark = next, "watch-mark");
            }
            marks.insert(account.to_string(), next);
        }
        Ok(())
    }
}

/// Splits a timeline page into the posts to enqueue and the new
/// high-water mark.
///
/// With no prior mark the page only primes: nothing is fresh. Posts
/// come back oldest first so inbound jobs keep timeline order.
fn fresh_posts(posts: &[TimelinePost], mark: Option<u64>) -> (Vec<&TimelinePost>, Option<u64>) {
    let newest = posts.iter().map(|post| post.id).max();
    let next_mark = newest.max(mark);
    let fresh = match mark {
        None => Vec::new(),
        Some(previous) => posts.iter().rev().filter(|post| post.id > previous).collect(),
    };
    (fresh, next_mark)
}
