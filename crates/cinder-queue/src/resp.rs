//! RESP wire codec for the disque-compatible queue server.
//!
//! Commands go out as arrays of bulk strings; replies come back as one of
//! five frame types (simple string, error, integer, bulk, array). The codec
//! is strict: malformed framing is a protocol error, never a guess. Bulk
//! payloads are required to be UTF-8 because every payload this bus carries
//! is text.

use bytes::BufMut;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::QueueError;

/// Upper bound on a single bulk reply. INFO output and job payloads are far
/// below this; anything larger means a desynced or hostile peer.
pub const MAX_BULK_LEN: usize = 16 * 1024 * 1024;

/// Upper bound on array reply elements. Dequeue batches are small; a huge
/// count means a desynced stream.
pub const MAX_ARRAY_LEN: usize = 4096;

/// One parsed server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK` style status line.
    Simple(String),
    /// `-ERR …` error line.
    Error(String),
    /// `:n` integer.
    Integer(i64),
    /// `$n` bulk string; `None` is the nil bulk (`$-1`).
    Bulk(Option<String>),
    /// `*n` array; `None` is the nil array (`*-1`).
    Array(Option<Vec<Reply>>),
}

/// Encode one command as a RESP array of bulk strings.
pub fn encode_command(args: &[&str], dst: &mut impl BufMut) {
    dst.put_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        dst.put_slice(format!("${}\r\n", arg.len()).as_bytes());
        dst.put_slice(arg.as_bytes());
        dst.put_slice(b"\r\n");
    }
}

/// Read one complete reply frame, recursing into array elements.
///
/// # Errors
///
/// - `QueueError::Io` when the connection closes or a read fails
/// - `QueueError::Protocol` on malformed framing, non-UTF-8 content, or
///   length prefixes beyond the sanity bounds
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply, QueueError>
where
    R: AsyncBufRead + Unpin + Send,
{
    let line = read_line(reader).await?;
    let mut chars = line.chars();
    let Some(kind) = chars.next() else {
        return Err(QueueError::Protocol("empty reply line".to_string()));
    };
    let rest = chars.as_str();

    match kind {
        '+' => Ok(Reply::Simple(rest.to_string())),
        '-' => Ok(Reply::Error(rest.to_string())),
        ':' => rest
            .parse::<i64>()
            .map(Reply::Integer)
            .map_err(|_| QueueError::Protocol(format!("bad integer reply: {rest:?}"))),
        '$' => match parse_len(rest)? {
            None => Ok(Reply::Bulk(None)),
            Some(len) if len > MAX_BULK_LEN => {
                Err(QueueError::Protocol(format!("bulk reply of {len} bytes exceeds limit")))
            },
            Some(len) => read_bulk(reader, len).await.map(|body| Reply::Bulk(Some(body))),
        },
        '*' => match parse_len(rest)? {
            None => Ok(Reply::Array(None)),
            Some(len) if len > MAX_ARRAY_LEN => {
                Err(QueueError::Protocol(format!("array reply of {len} elements exceeds limit")))
            },
            Some(len) => {
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(Box::pin(read_reply(reader)).await?);
                }
                Ok(Reply::Array(Some(items)))
            },
        },
        other => Err(QueueError::Protocol(format!("unknown reply type marker: {other:?}"))),
    }
}

/// Read one CRLF-terminated line, without the terminator.
async fn read_line<R>(reader: &mut R) -> Result<String, QueueError>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut raw = Vec::new();
    let n = reader.read_until(b'\n', &mut raw).await?;
    if n == 0 {
        return Err(QueueError::Io("connection closed by queue server".to_string()));
    }
    if !raw.ends_with(b"\r\n") {
        return Err(QueueError::Protocol("reply line missing CRLF terminator".to_string()));
    }
    raw.truncate(raw.len() - 2);
    String::from_utf8(raw)
        .map_err(|_| QueueError::Protocol("non-UTF-8 reply line".to_string()))
}

/// Read a bulk body of `len` bytes plus its trailing CRLF.
async fn read_bulk<R>(reader: &mut R, len: usize) -> Result<String, QueueError>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut buf = vec![0u8; len + 2];
    reader.read_exact(&mut buf).await?;
    if !buf.ends_with(b"\r\n") {
        return Err(QueueError::Protocol("bulk reply missing CRLF terminator".to_string()));
    }
    buf.truncate(len);
    String::from_utf8(buf).map_err(|_| QueueError::Protocol("non-UTF-8 bulk reply".to_string()))
}

/// Parse a `$`/`*` length prefix; `-1` is the nil marker.
fn parse_len(s: &str) -> Result<Option<usize>, QueueError> {
    if s == "-1" {
        return Ok(None);
    }
    s.parse::<usize>()
        .map(Some)
        .map_err(|_| QueueError::Protocol(format!("bad length prefix: {s:?}")))
}

#[cfg(test)]
mod tests {
    use tokio::io::BufReader;

    use super::*;

    async fn parse(bytes: &[u8]) -> Result<Reply, QueueError> {
        let mut reader = BufReader::new(bytes);
        read_reply(&mut reader).await
    }

    #[test]
    fn encode_addjob_command() {
        let mut wire = Vec::new();
        encode_command(&["ADDJOB", "out", "paste~abc~1000", "200"], &mut wire);
        assert_eq!(
            wire,
            b"*4\r\n$6\r\nADDJOB\r\n$3\r\nout\r\n$14\r\npaste~abc~1000\r\n$3\r\n200\r\n"
        );
    }

    #[test]
    fn encode_counts_bytes_not_chars() {
        let mut wire = Vec::new();
        encode_command(&["PING", "héllo"], &mut wire);
        // 'é' is two bytes in UTF-8, so the bulk length must be 6.
        assert_eq!(wire, "*2\r\n$4\r\nPING\r\n$6\r\nhéllo\r\n".as_bytes());
    }

    #[tokio::test]
    async fn parse_simple_and_error() {
        assert_eq!(parse(b"+OK\r\n").await, Ok(Reply::Simple("OK".to_string())));
        assert_eq!(
            parse(b"-ERR unknown command\r\n").await,
            Ok(Reply::Error("ERR unknown command".to_string()))
        );
    }

    #[tokio::test]
    async fn parse_integer() {
        assert_eq!(parse(b":42\r\n").await, Ok(Reply::Integer(42)));
        assert_eq!(parse(b":-3\r\n").await, Ok(Reply::Integer(-3)));
    }

    #[tokio::test]
    async fn parse_bulk_and_nil_bulk() {
        assert_eq!(parse(b"$5\r\nhello\r\n").await, Ok(Reply::Bulk(Some("hello".to_string()))));
        assert_eq!(parse(b"$0\r\n\r\n").await, Ok(Reply::Bulk(Some(String::new()))));
        assert_eq!(parse(b"$-1\r\n").await, Ok(Reply::Bulk(None)));
    }

    #[tokio::test]
    async fn parse_nested_array() {
        let wire = b"*1\r\n*3\r\n$3\r\nout\r\n$5\r\nD-abc\r\n$9\r\npaste~a~1\r\n";
        let expected = Reply::Array(Some(vec![Reply::Array(Some(vec![
            Reply::Bulk(Some("out".to_string())),
            Reply::Bulk(Some("D-abc".to_string())),
            Reply::Bulk(Some("paste~a~1".to_string())),
        ]))]));
        assert_eq!(parse(wire).await, Ok(expected));
    }

    #[tokio::test]
    async fn parse_nil_array() {
        assert_eq!(parse(b"*-1\r\n").await, Ok(Reply::Array(None)));
        assert_eq!(parse(b"*0\r\n").await, Ok(Reply::Array(Some(Vec::new()))));
    }

    #[tokio::test]
    async fn reject_truncated_stream() {
        assert!(matches!(parse(b"").await, Err(QueueError::Io(_))));
        assert!(matches!(parse(b"$10\r\nshort\r\n").await, Err(QueueError::Io(_))));
    }

    #[tokio::test]
    async fn reject_malformed_framing() {
        assert!(matches!(parse(b"+OK\n").await, Err(QueueError::Protocol(_))));
        assert!(matches!(parse(b"?what\r\n").await, Err(QueueError::Protocol(_))));
        assert!(matches!(parse(b":abc\r\n").await, Err(QueueError::Protocol(_))));
        assert!(matches!(parse(b"$nope\r\n").await, Err(QueueError::Protocol(_))));
    }

    #[tokio::test]
    async fn reject_oversized_length_prefixes() {
        assert!(matches!(parse(b"$99999999999\r\n").await, Err(QueueError::Protocol(_))));
        assert!(matches!(parse(b"*99999\r\n").await, Err(QueueError::Protocol(_))));
    }
}
