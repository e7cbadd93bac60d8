//! TCP client for a disque-compatible job-queue server.
//!
//! One connection, one in-flight command at a time: every public method takes
//! the connection lock, writes a single command, and reads a single reply.
//! That is all the concurrency the bus needs - each consumer process owns its
//! own client - and it keeps the reply stream trivially in sync with the
//! command stream.
//!
//! Cluster awareness is deliberately absent. `connect` walks the endpoint
//! list and settles on the first node that answers; job routing between nodes
//! is the server's business.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::Mutex,
};

use crate::{
    error::QueueError,
    queue::{JobId, JobQueue, QueuedJob},
    resp::{self, Reply},
};

/// Replication timeout in milliseconds passed to ADDJOB. The server rejects
/// the enqueue if it cannot replicate within this bound.
const ADDJOB_TIMEOUT_MS: &str = "200";

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// Client for one node of a disque-compatible queue server.
pub struct DisqueClient {
    conn: Mutex<Connection>,
    endpoint: String,
}

impl DisqueClient {
    /// Default server port, `host:port` form.
    pub const DEFAULT_ENDPOINT: &'static str = "localhost:7711";

    /// Connect to the first reachable endpoint in the list.
    ///
    /// # Errors
    ///
    /// - `QueueError::Connect` when the list is empty or every endpoint
    ///   refuses the connection
    pub async fn connect(endpoints: &[String]) -> Result<Self, QueueError> {
        let mut last_failure = "no endpoints configured".to_string();
        for endpoint in endpoints {
            match TcpStream::connect(endpoint.as_str()).await {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    let (read_half, write_half) = stream.into_split();
                    return Ok(Self {
                        conn: Mutex::new(Connection {
                            reader: BufReader::new(read_half),
                            writer: write_half,
                        }),
                        endpoint: endpoint.clone(),
                    });
                },
                Err(err) => last_failure = format!("{endpoint}: {err}"),
            }
        }
        Err(QueueError::Connect { detail: last_failure })
    }

    /// The endpoint this client settled on.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one command and read its reply. Error replies surface as
    /// `QueueError::Server` so callers only match on success shapes.
    async fn command(&self, args: &[&str]) -> Result<Reply, QueueError> {
        let mut conn = self.conn.lock().await;
        let mut wire = Vec::new();
        resp::encode_command(args, &mut wire);
        conn.writer.write_all(&wire).await?;
        conn.writer.flush().await?;
        match resp::read_reply(&mut conn.reader).await? {
            Reply::Error(message) => Err(QueueError::Server(message)),
            reply => Ok(reply),
        }
    }
}

#[async_trait]
impl JobQueue for DisqueClient {
    async fn enqueue(&self, queue: &str, payload: &str) -> Result<JobId, QueueError> {
        let reply = self.command(&["ADDJOB", queue, payload, ADDJOB_TIMEOUT_MS]).await?;
        match reply {
            Reply::Simple(id) | Reply::Bulk(Some(id)) => Ok(JobId::new(id)),
            other => Err(QueueError::Protocol(format!("unexpected ADDJOB reply: {other:?}"))),
        }
    }

    async fn dequeue(
        &self,
        queues: &[&str],
        count: usize,
        blocking: bool,
    ) -> Result<Vec<QueuedJob>, QueueError> {
        let count_arg = count.to_string();
        let mut args: Vec<&str> = vec!["GETJOB"];
        if !blocking {
            args.push("NOHANG");
        }
        args.push("COUNT");
        args.push(&count_arg);
        args.push("FROM");
        args.extend_from_slice(queues);

        match self.command(&args).await? {
            Reply::Array(None) => Ok(Vec::new()),
            Reply::Array(Some(items)) => items.into_iter().map(decode_job).collect(),
            other => Err(QueueError::Protocol(format!("unexpected GETJOB reply: {other:?}"))),
        }
    }

    async fn ack(&self, id: &JobId) -> Result<(), QueueError> {
        expect_count(self.command(&["ACKJOB", id.as_str()]).await?, "ACKJOB")
    }

    async fn nack(&self, id: &JobId) -> Result<(), QueueError> {
        expect_count(self.command(&["NACKJOB", id.as_str()]).await?, "NACKJOB")
    }

    async fn delete_job(&self, id: &JobId) -> Result<(), QueueError> {
        expect_count(self.command(&["DELJOB", id.as_str()]).await?, "DELJOB")
    }

    async fn info(&self) -> Result<BTreeMap<String, String>, QueueError> {
        match self.command(&["INFO"]).await? {
            Reply::Bulk(Some(body)) => Ok(parse_info(&body)),
            other => Err(QueueError::Protocol(format!("unexpected INFO reply: {other:?}"))),
        }
    }
}

/// Decode one GETJOB element: `[queue, id, payload]` as bulk strings.
fn decode_job(item: Reply) -> Result<QueuedJob, QueueError> {
    let Reply::Array(Some(fields)) = item else {
        return Err(QueueError::Protocol("GETJOB element is not an array".to_string()));
    };
    let mut fields = fields.into_iter();
    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (
            Some(Reply::Bulk(Some(queue))),
            Some(Reply::Bulk(Some(id))),
            Some(Reply::Bulk(Some(payload))),
            None,
        ) => Ok(QueuedJob { queue, id: JobId::new(id), payload }),
        _ => Err(QueueError::Protocol("GETJOB element is not [queue, id, payload]".to_string())),
    }
}

/// ACKJOB/NACKJOB/DELJOB reply with the number of jobs touched.
fn expect_count(reply: Reply, command: &str) -> Result<(), QueueError> {
    match reply {
        Reply::Integer(_) | Reply::Simple(_) => Ok(()),
        other => Err(QueueError::Protocol(format!("unexpected {command} reply: {other:?}"))),
    }
}

/// INFO body: `key:value` lines, `#` section headers and blanks skipped.
fn parse_info(body: &str) -> BTreeMap<String, String> {
    body.lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}
