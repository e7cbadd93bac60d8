//! In-memory queue with the same observable semantics as the wire client.
//!
//! Backs integration tests and local experiments. Clones share state through
//! an `Arc`, so one instance can be handed to a producer and a consumer and
//! they see the same queues - mirroring separate processes sharing a server.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::{
    error::QueueError,
    queue::{JobId, JobQueue, QueuedJob},
};

#[derive(Default)]
struct MemoryState {
    /// Pending jobs per named queue, front is next out.
    queues: HashMap<String, VecDeque<(JobId, String)>>,
    /// Delivered-but-unacked jobs, keyed by id.
    unacked: HashMap<JobId, UnackedJob>,
    /// Monotonic id source.
    next_id: u64,
}

struct UnackedJob {
    queue: String,
    payload: String,
}

impl MemoryState {
    fn allocate_id(&mut self) -> JobId {
        self.next_id += 1;
        JobId::new(format!("M-{:012}", self.next_id))
    }

    /// Pop up to `count` jobs across the named queues, in queue order, moving
    /// each into the unacked set.
    fn take_jobs(&mut self, queues: &[&str], count: usize) -> Vec<QueuedJob> {
        let mut jobs = Vec::new();
        for &queue in queues {
            while jobs.len() < count {
                let Some((id, payload)) = self.queues.get_mut(queue).and_then(VecDeque::pop_front)
                else {
                    break;
                };
                self.unacked.insert(
                    id.clone(),
                    UnackedJob { queue: queue.to_string(), payload: payload.clone() },
                );
                jobs.push(QueuedJob { queue: queue.to_string(), id, payload });
            }
            if jobs.len() >= count {
                break;
            }
        }
        jobs
    }
}

/// In-process [`JobQueue`] implementation.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    state: Arc<Mutex<MemoryState>>,
    notify: Arc<Notify>,
}

impl MemoryQueue {
    /// Create an empty queue set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending (not yet delivered) jobs in a named queue.
    ///
    /// Diagnostic accessor for tests and local tooling.
    pub async fn depth(&self, queue: &str) -> usize {
        let state = self.state.lock().await;
        state.queues.get(queue).map_or(0, VecDeque::len)
    }

    /// Number of delivered-but-unacked jobs across all queues.
    pub async fn unacked_len(&self) -> usize {
        let state = self.state.lock().await;
        state.unacked.len()
    }

    /// Pending payloads of a named queue, front to back.
    pub async fn pending_payloads(&self, queue: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .queues
            .get(queue)
            .map(|jobs| jobs.iter().map(|(_, payload)| payload.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, queue: &str, payload: &str) -> Result<JobId, QueueError> {
        let id = {
            let mut state = self.state.lock().await;
            let id = state.allocate_id();
            state
                .queues
                .entry(queue.to_string())
                .or_default()
                .push_back((id.clone(), payload.to_string()));
            id
        };
        // notify_one stores a permit, so a dequeuer registering later still
        // wakes. Notify outside the lock.
        self.notify.notify_one();
        Ok(id)
    }

    async fn dequeue(
        &self,
        queues: &[&str],
        count: usize,
        blocking: bool,
    ) -> Result<Vec<QueuedJob>, QueueError> {
        loop {
            let (jobs, more_pending) = {
                let mut state = self.state.lock().await;
                let jobs = state.take_jobs(queues, count);
                let more_pending = queues
                    .iter()
                    .any(|queue| state.queues.get(*queue).is_some_and(|jobs| !jobs.is_empty()));
                (jobs, more_pending)
            };
            if !jobs.is_empty() {
                // Stored permits coalesce, so one wakeup can stand for
                // several enqueues. Pass it on while jobs remain or a
                // second blocking waiter could sleep through a backlog.
                if more_pending {
                    self.notify.notify_one();
                }
                return Ok(jobs);
            }
            if !blocking {
                return Ok(Vec::new());
            }
            self.notify.notified().await;
        }
    }

    async fn ack(&self, id: &JobId) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state
            .unacked
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| QueueError::UnknownJob(id.to_string()))
    }

    async fn nack(&self, id: &JobId) -> Result<(), QueueError> {
        {
            let mut state = self.state.lock().await;
            let job = state
                .unacked
                .remove(id)
                .ok_or_else(|| QueueError::UnknownJob(id.to_string()))?;
            state
                .queues
                .entry(job.queue)
                .or_default()
                .push_front((id.clone(), job.payload));
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn delete_job(&self, id: &JobId) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if state.unacked.remove(id).is_some() {
            return Ok(());
        }
        for jobs in state.queues.values_mut() {
            if let Some(position) = jobs.iter().position(|(job_id, _)| job_id == id) {
                jobs.remove(position);
                return Ok(());
            }
        }
        Err(QueueError::UnknownJob(id.to_string()))
    }

    async fn info(&self) -> Result<BTreeMap<String, String>, QueueError> {
        let state = self.state.lock().await;
        let mut map = BTreeMap::new();
        map.insert("queues".to_string(), state.queues.len().to_string());
        map.insert(
            "pending".to_string(),
            state.queues.values().map(VecDeque::len).sum::<usize>().to_string(),
        );
        map.insert("unacked".to_string(), state.unacked.len().to_string());
        for (name, jobs) in &state.queues {
            map.insert(format!("pending.{name}"), jobs.len().to_string());
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn enqueue_then_dequeue_in_order() {
        let queue = MemoryQueue::new();
        queue.enqueue("out", "first").await.expect("enqueue");
        queue.enqueue("out", "second").await.expect("enqueue");

        let jobs = queue.dequeue(&["out"], 2, false).await.expect("dequeue");
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].payload, "first");
        assert_eq!(jobs[1].payload, "second");
        assert_eq!(jobs[0].queue, "out");
        assert_eq!(queue.unacked_len().await, 2);
    }

    #[tokio::test]
    async fn nonblocking_dequeue_on_empty_returns_nothing() {
        let queue = MemoryQueue::new();
        let jobs = queue.dequeue(&["out"], 1, false).await.expect("dequeue");
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn ack_removes_the_delivery() {
        let queue = MemoryQueue::new();
        queue.enqueue("out", "job").await.expect("enqueue");
        let jobs = queue.dequeue(&["out"], 1, false).await.expect("dequeue");

        queue.ack(&jobs[0].id).await.expect("ack");
        assert_eq!(queue.unacked_len().await, 0);
        assert_eq!(queue.depth("out").await, 0);

        // Second ack of the same id is an error: the delivery is gone.
        assert!(matches!(queue.ack(&jobs[0].id).await, Err(QueueError::UnknownJob(_))));
    }

    #[tokio::test]
    async fn nack_redelivers_at_the_front() {
        let queue = MemoryQueue::new();
        queue.enqueue("out", "first").await.expect("enqueue");
        queue.enqueue("out", "second").await.expect("enqueue");

        let jobs = queue.dequeue(&["out"], 1, false).await.expect("dequeue");
        assert_eq!(jobs[0].payload, "first");
        queue.nack(&jobs[0].id).await.expect("nack");

        // Redelivered before "second": NACK means retry promptly.
        let jobs = queue.dequeue(&["out"], 1, false).await.expect("dequeue");
        assert_eq!(jobs[0].payload, "first");
    }

    #[tokio::test]
    async fn delete_job_reaches_pending_and_unacked() {
        let queue = MemoryQueue::new();
        let pending = queue.enqueue("out", "pending").await.expect("enqueue");
        queue.enqueue("out", "delivered").await.expect("enqueue");

        queue.delete_job(&pending).await.expect("delete pending");
        let jobs = queue.dequeue(&["out"], 1, false).await.expect("dequeue");
        assert_eq!(jobs[0].payload, "delivered");

        queue.delete_job(&jobs[0].id).await.expect("delete unacked");
        assert_eq!(queue.unacked_len().await, 0);

        assert!(matches!(queue.delete_job(&pending).await, Err(QueueError::UnknownJob(_))));
    }

    #[tokio::test]
    async fn dequeue_spans_queues_in_order() {
        let queue = MemoryQueue::new();
        queue.enqueue("in", "incoming").await.expect("enqueue");
        queue.enqueue("out", "outgoing").await.expect("enqueue");

        let jobs = queue.dequeue(&["out", "in"], 2, false).await.expect("dequeue");
        assert_eq!(jobs[0].queue, "out");
        assert_eq!(jobs[1].queue, "in");
    }

    #[tokio::test]
    async fn blocking_dequeue_wakes_on_enqueue() {
        let queue = MemoryQueue::new();
        let waiter = queue.clone();

        let handle = tokio::spawn(async move { waiter.dequeue(&["out"], 1, true).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue("out", "late arrival").await.expect("enqueue");

        let jobs = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("dequeue should wake")
            .expect("task should not panic")
            .expect("dequeue should succeed");
        assert_eq!(jobs[0].payload, "late arrival");
    }

    #[tokio::test]
    async fn burst_enqueue_wakes_every_blocking_waiter() {
        let queue = MemoryQueue::new();
        let first = queue.clone();
        let second = queue.clone();

        let waiters = [
            tokio::spawn(async move { first.dequeue(&["out"], 1, true).await }),
            tokio::spawn(async move { second.dequeue(&["out"], 1, true).await }),
        ];

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue("out", "one").await.expect("enqueue");
        queue.enqueue("out", "two").await.expect("enqueue");

        // Back-to-back enqueues may coalesce into one stored permit;
        // both waiters must wake regardless.
        let mut payloads = Vec::new();
        for waiter in waiters {
            let jobs = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("every waiter should wake")
                .expect("task should not panic")
                .expect("dequeue should succeed");
            payloads.push(jobs[0].payload.clone());
        }
        payloads.sort();
        assert_eq!(payloads, ["one", "two"]);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let producer = MemoryQueue::new();
        let consumer = producer.clone();

        producer.enqueue("out", "shared").await.expect("enqueue");
        let jobs = consumer.dequeue(&["out"], 1, false).await.expect("dequeue");
        assert_eq!(jobs[0].payload, "shared");
    }

    #[tokio::test]
    async fn info_reports_depths() {
        let queue = MemoryQueue::new();
        queue.enqueue("out", "a").await.expect("enqueue");
        queue.enqueue("out", "b").await.expect("enqueue");
        queue.enqueue("in", "c").await.expect("enqueue");
        let _ = queue.dequeue(&["in"], 1, false).await.expect("dequeue");

        let info = queue.info().await.expect("info");
        assert_eq!(info.get("pending.out").map(String::as_str), Some("2"));
        assert_eq!(info.get("pending.in").map(String::as_str), Some("0"));
        assert_eq!(info.get("unacked").map(String::as_str), Some("1"));
    }
}
