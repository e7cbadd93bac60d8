//! Paste service client.
//!
//! Message blobs travel through a hosted paste service with a
//! gist-shaped REST API: one JSON document per paste, the body filed
//! under a fixed file name. Authentication is a single personal access
//! token from the vault.

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{RemoteError, Result};

const SERVICE: &str = "paste";

/// Default API root for the paste service.
pub const DEFAULT_PASTE_URL: &str = "https://api.github.com";

/// Media type that inlines raw file content into paste lookups.
const RAW_CONTENT_ACCEPT: &str = "application/vnd.github.v3.raw+json";

const USER_AGENT: &str = concat!("cinder/", env!("CARGO_PKG_VERSION"));

/// File name the message body is stored under inside each paste.
const MESSAGE_FILE: &str = "message";

/// HTTP client for creating, fetching, and destroying pastes.
pub struct PasteClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl PasteClient {
    /// Builds a client against the hosted service.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_PASTE_URL)
    }

    /// Builds a client against an alternate API root.
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| RemoteError::Http(err.to_string()))?;
        Ok(Self { client, base_url: base_url.into(), token: token.into() })
    }

    fn auth(&self) -> String {
        format!("token {}", self.token)
    }

    /// Creates a paste holding `content` and returns its id, or `None`
    /// when the service declines the upload.
    ///
    /// The description carries the owner, a wall-clock stamp, and a
    /// short random tag so pastes stay distinguishable in the service's
    /// own UI.
    pub async fn create(&self, content: &str, owner: &str, public: bool) -> Result<Option<String>> {
        let url = format!("{}/gists", self.base_url);
        let body = json!({
            "files": { MESSAGE_FILE: { "content": content } },
            "public": public,
            "description": describe(owner),
        });

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .header(reqwest::header::ACCEPT, RAW_CONTENT_ACCEPT)
            .json(&body)
            .send()
            .await
            .map_err(|err| RemoteError::Http(err.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::CREATED {
            warn!(%status, "paste-post");
            return Ok(None);
        }

        let body: Value = response.json().await.map_err(|err| RemoteError::Response {
            service: SERVICE,
            detail: err.to_string(),
        })?;
        let id = artifact_id(&body).ok_or_else(|| RemoteError::Response {
            service: SERVICE,
            detail: "create response carries no paste id".to_string(),
        })?;
        debug!(artifact_id = %id, "paste-post");
        Ok(Some(id))
    }

    /// Fetches the message body of a paste, or `None` when the paste is
    /// gone or the service declines the lookup.
    pub async fn fetch(&self, artifact_id: &str) -> Result<Option<String>> {
        let url = format!("{}/gists/{artifact_id}", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .header(reqwest::header::ACCEPT, RAW_CONTENT_ACCEPT)
            .send()
            .await
            .map_err(|err| RemoteError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(artifact_id = %artifact_id, %status, "paste-get");
            return Ok(None);
        }

        let body: Value = response.json().await.map_err(|err| RemoteError::Response {
            service: SERVICE,
            detail: err.to_string(),
        })?;
        let content = message_content(&body).ok_or_else(|| RemoteError::Response {
            service: SERVICE,
            detail: format!("paste {artifact_id} carries no {MESSAGE_FILE} file"),
        })?;
        debug!(artifact_id = %artifact_id, "paste-get");
        Ok(Some(content))
    }

    /// Deletes a paste. Returns whether the service confirmed removal.
    ///
    /// Deleting an id that is already gone is not an error; the caller
    /// sees `false` and decides what that means.
    pub async fn destroy(&self, artifact_id: &str) -> Result<bool> {
        let url = format!("{}/gists/{artifact_id}", self.base_url);

        let response = self
            .client
            .delete(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .send()
            .await
            .map_err(|err| RemoteError::Http(err.to_string()))?;

        Ok(response.status() == reqwest::StatusCode::NO_CONTENT)
    }
}

/// Renders the description line for a fresh paste.
fn describe(owner: &str) -> String {
    let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
    format!("{owner} {stamp} {}", random_tag())
}

/// Short random suffix keeping same-second descriptions distinct.
fn random_tag() -> String {
    let mut bytes = [0u8; 4];
    #[allow(clippy::expect_used)]
    getrandom::fill(&mut bytes).expect("invariant: operating system RNG must be available");
    hex::encode(bytes)
}

fn artifact_id(body: &Value) -> Option<String> {
    body.get("id").and_then(Value::as_str).map(str::to_string)
}

fn message_content(body: &Value) -> Option<String> {
    body.get("files")?
        .get(MESSAGE_FILE)?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_id_reads_create_response() {
        let body = json!({"id": "abc123", "html_url": "https://example.invalid/abc123"});
        assert_eq!(artifact_id(&body), Some("abc123".to_string()));
    }

    #[test]
    fn artifact_id_rejects_non_string_ids() {
        assert_eq!(artifact_id(&json!({"id": 42})), None);
        assert_eq!(artifact_id(&json!({})), None);
    }

    #[test]
    fn message_content_reads_lookup_response() {
        let body = json!({
            "id": "abc123",
            "files": {
                "message": { "filename": "message", "content": "BEGIN SALTPACK" }
            }
        });
        assert_eq!(message_content(&body), Some("BEGIN SALTPACK".to_string()));
    }

    #[test]
    fn message_content_requires_the_message_file() {
        let body = json!({
            "id": "abc123",
            "files": {
                "notes.txt": { "content": "unrelated" }
            }
        });
        assert_eq!(message_content(&body), None);
    }

    #[test]
    fn describe_carries_owner_stamp_and_tag() {
        let line = describe("zyx");

        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(fields.len(), 4, "owner, date, time, tag: {line}");
        assert_eq!(fields[0], "zyx");
        assert_eq!(fields[3].len(), 8);
        assert!(fields[3].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
