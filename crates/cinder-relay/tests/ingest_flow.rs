//! End-to-end ingest tests over the in-memory queue.
//!
//! These drive the consumer by stepping `receive_once` directly: jobs
//! sit in a `MemoryQueue` and the paste/agent side is a scripted
//! opener, so no network or keyring is involved.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cinder_proto::IN_QUEUE;
use cinder_queue::{JobId, JobQueue, MemoryQueue, QueueError, QueuedJob};
use cinder_relay::{IngestConsumer, RelayError};
use cinder_remote::{Opened, Opener, RemoteError, Verification};
use tokio::sync::watch;

/// Opener that answers from a script and records every call.
///
/// `fetch` also snapshots the queue's unacked count, so tests can pin
/// that the job was ACKed before opening began.
#[derive(Clone)]
struct ScriptedOpener {
    queue: MemoryQueue,
    logged_out: bool,
    paste_missing: bool,
    fetch_fails: bool,
    verify_rejects: bool,
    verify_fails: bool,
    decrypt_fails: bool,
    calls: Arc<Mutex<Vec<String>>>,
    unacked_at_fetch: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedOpener {
    fn new(queue: &MemoryQueue) -> Self {
        Self {
            queue: queue.clone(),
            logged_out: false,
            paste_missing: false,
            fetch_fails: false,
            verify_rejects: false,
            verify_fails: false,
            decrypt_fails: false,
            calls: Arc::default(),
            unacked_at_fetch: Arc::default(),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn unacked_at_fetch(&self) -> Vec<usize> {
        self.unacked_at_fetch.lock().unwrap().clone()
    }
}

#[async_trait]
impl Opener for ScriptedOpener {
    async fn status(&self) -> Result<bool, RemoteError> {
        Ok(!self.logged_out)
    }

    async fn fetch(&self, artifact_id: &str) -> Result<Option<String>, RemoteError> {
        let unacked = self.queue.unacked_len().await;
        self.unacked_at_fetch.lock().unwrap().push(unacked);
        self.calls.lock().unwrap().push(format!("fetch {artifact_id}"));
        if self.fetch_fails {
            return Err(RemoteError::Http("connection reset".to_string()));
        }
        if self.paste_missing {
            return Ok(None);
        }
        Ok(Some("sealed blob".to_string()))
    }

    async fn verify(&self, _blob: &str) -> Result<Verification, RemoteError> {
        self.calls.lock().unwrap().push("verify".to_string());
        if self.verify_fails {
            return Err(RemoteError::Agent {
                operation: "verify",
                detail: "agent exited with status 2".to_string(),
            });
        }
        Ok(Verification {
            ok: !self.verify_rejects,
            signer: Some("zyx".to_string()),
            inner_text: "inner ciphertext".to_string(),
        })
    }

    async fn decrypt(&self, _blob: &str) -> Result<Opened, RemoteError> {
        self.calls.lock().unwrap().push("decrypt".to_string());
        if self.decrypt_fails {
            return Err(RemoteError::Agent {
                operation: "decrypt",
                detail: "secret key not available".to_string(),
            });
        }
        Ok(Opened { author: Some("zyx".to_string()), plaintext: "meet at noon".to_string() })
    }
}

fn consumer(
    queue: MemoryQueue,
    opener: ScriptedOpener,
) -> IngestConsumer<MemoryQueue, ScriptedOpener> {
    IngestConsumer::new(queue, opener, Duration::from_millis(10))
}

#[tokio::test]
async fn test_inbound_job_is_acked_before_opening() {
    let queue = MemoryQueue::new();
    queue.enqueue(IN_QUEUE, "abc123").await.unwrap();
    let opener = ScriptedOpener::new(&queue);
    let consumer = consumer(queue.clone(), opener.clone());

    consumer.receive_once().await.expect("receive should open the job");

    // Receipt settles the job before the first remote call: the
    // opener saw no unacked delivery when fetch ran.
    assert_eq!(opener.unacked_at_fetch(), vec![0]);
    assert_eq!(opener.calls(), vec!["fetch abc123", "verify", "decrypt"]);
    assert_eq!(queue.depth(IN_QUEUE).await, 0);
    assert_eq!(queue.unacked_len().await, 0);
}

#[tokio::test]
async fn test_missing_paste_is_skipped_not_fatal() {
    let queue = MemoryQueue::new();
    queue.enqueue(IN_QUEUE, "gone1").await.unwrap();
    queue.enqueue(IN_QUEUE, "gone2").await.unwrap();
    let opener = ScriptedOpener { paste_missing: true, ..ScriptedOpener::new(&queue) };
    let consumer = consumer(queue.clone(), opener.clone());

    consumer.receive_once().await.expect("missing paste is not fatal");
    consumer.receive_once().await.expect("the next job is still served");

    // Both jobs were tried and neither came back.
    assert_eq!(opener.calls(), vec!["fetch gone1", "fetch gone2"]);
    assert_eq!(queue.depth(IN_QUEUE).await, 0);
    assert_eq!(queue.unacked_len().await, 0);
}

#[tokio::test]
async fn test_fetch_failure_is_skipped_not_fatal() {
    let queue = MemoryQueue::new();
    queue.enqueue(IN_QUEUE, "flaky").await.unwrap();
    let opener = ScriptedOpener { fetch_fails: true, ..ScriptedOpener::new(&queue) };
    let consumer = consumer(queue.clone(), opener.clone());

    consumer.receive_once().await.expect("fetch failure is not fatal");

    assert_eq!(opener.calls(), vec!["fetch flaky"]);
    assert_eq!(queue.depth(IN_QUEUE).await, 0);
    assert_eq!(queue.unacked_len().await, 0);
}

#[tokio::test]
async fn test_tampered_message_is_dropped_before_decrypting() {
    let queue = MemoryQueue::new();
    queue.enqueue(IN_QUEUE, "abc123").await.unwrap();
    let opener = ScriptedOpener { verify_rejects: true, ..ScriptedOpener::new(&queue) };
    let consumer = consumer(queue.clone(), opener.clone());

    consumer.receive_once().await.expect("a bad signature is not fatal");

    // Decrypt is never reached for an unverified blob.
    assert_eq!(opener.calls(), vec!["fetch abc123", "verify"]);
    assert_eq!(queue.depth(IN_QUEUE).await, 0);
    assert_eq!(queue.unacked_len().await, 0);
}

#[tokio::test]
async fn test_signature_check_failure_is_skipped_not_fatal() {
    let queue = MemoryQueue::new();
    queue.enqueue(IN_QUEUE, "abc123").await.unwrap();
    let opener = ScriptedOpener { verify_fails: true, ..ScriptedOpener::new(&queue) };
    let consumer = consumer(queue.clone(), opener.clone());

    consumer.receive_once().await.expect("a verify error is not fatal");

    assert_eq!(opener.calls(), vec!["fetch abc123", "verify"]);
    assert_eq!(queue.depth(IN_QUEUE).await, 0);
}

#[tokio::test]
async fn test_foreign_ciphertext_is_skipped_not_fatal() {
    let queue = MemoryQueue::new();
    queue.enqueue(IN_QUEUE, "abc123").await.unwrap();
    let opener = ScriptedOpener { decrypt_fails: true, ..ScriptedOpener::new(&queue) };
    let consumer = consumer(queue.clone(), opener.clone());

    consumer.receive_once().await.expect("foreign ciphertext is not fatal");

    assert_eq!(opener.calls(), vec!["fetch abc123", "verify", "decrypt"]);
    assert_eq!(queue.depth(IN_QUEUE).await, 0);
    assert_eq!(queue.unacked_len().await, 0);
}

/// Queue whose transport is down.
struct BrokenQueue;

impl BrokenQueue {
    fn down() -> QueueError {
        QueueError::Io("wire down".to_string())
    }
}

#[async_trait]
impl JobQueue for BrokenQueue {
    async fn enqueue(&self, _queue: &str, _payload: &str) -> Result<JobId, QueueError> {
        Err(Self::down())
    }

    async fn dequeue(
        &self,
        _queues: &[&str],
        _count: usize,
        _blocking: bool,
    ) -> Result<Vec<QueuedJob>, QueueError> {
        Err(Self::down())
    }

    async fn ack(&self, _id: &JobId) -> Result<(), QueueError> {
        Err(Self::down())
    }

    async fn nack(&self, _id: &JobId) -> Result<(), QueueError> {
        Err(Self::down())
    }

    async fn delete_job(&self, _id: &JobId) -> Result<(), QueueError> {
        Err(Self::down())
    }

    async fn info(&self) -> Result<BTreeMap<String, String>, QueueError> {
        Err(Self::down())
    }
}

#[tokio::test]
async fn test_queue_failure_is_fatal() {
    let opener = ScriptedOpener::new(&MemoryQueue::new());
    let consumer = IngestConsumer::new(BrokenQueue, opener.clone(), Duration::from_millis(10));

    let err = consumer.receive_once().await.expect_err("transport loss must bubble out");

    assert!(matches!(err, RelayError::Queue(_)));
    assert!(opener.calls().is_empty());
}

#[tokio::test]
async fn test_run_refuses_without_a_logged_in_user() {
    let queue = MemoryQueue::new();
    queue.enqueue(IN_QUEUE, "abc123").await.unwrap();
    let opener = ScriptedOpener { logged_out: true, ..ScriptedOpener::new(&queue) };
    let consumer = consumer(queue.clone(), opener.clone());
    let (_tx, rx) = watch::channel(false);

    let err = consumer.run(rx).await.expect_err("run must refuse without a user");

    assert!(matches!(err, RelayError::NotLoggedIn));
    assert!(opener.calls().is_empty());
    assert_eq!(queue.depth(IN_QUEUE).await, 1);
}
