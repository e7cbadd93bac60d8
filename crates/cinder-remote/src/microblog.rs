//! Micro-blog service client.
//!
//! Posts announce paste ids to recipients and are the second artifact
//! kind the expiry loop deletes. The API is the classic 1.1 REST
//! surface: form-encoded writes, JSON reads, OAuth 1.0a on every call.

use cinder_core::{Clock as _, SystemClock};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{RemoteError, Result};
use crate::oauth;
use crate::vault::MicroblogKeys;

const SERVICE: &str = "microblog";

/// Default API root for the micro-blog service.
pub const DEFAULT_MICROBLOG_URL: &str = "https://api.twitter.com/1.1";

const USER_AGENT: &str = concat!("cinder/", env!("CARGO_PKG_VERSION"));

/// Posts fetched per timeline page. Plenty for a polling watcher.
const TIMELINE_PAGE: &str = "50";

/// One post from a watched account's timeline, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct TimelinePost {
    /// Service-assigned post id.
    pub id: u64,
    /// Post body.
    pub text: String,
}

/// HTTP client for publishing, destroying, and reading posts.
pub struct MicroblogClient {
    client: reqwest::Client,
    base_url: String,
    keys: MicroblogKeys,
    clock: SystemClock,
}

impl MicroblogClient {
    /// Builds a client against the hosted service.
    pub fn new(keys: MicroblogKeys) -> Result<Self> {
        Self::with_base_url(keys, DEFAULT_MICROBLOG_URL)
    }

    /// Builds a client against an alternate API root.
    pub fn with_base_url(keys: MicroblogKeys, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| RemoteError::Http(err.to_string()))?;
        Ok(Self { client, base_url: base_url.into(), keys, clock: SystemClock::new() })
    }

    fn oauth(&self, method: &str, url: &str, params: &[(&str, &str)]) -> String {
        oauth::authorization_header(
            &self.keys,
            method,
            url,
            params,
            &oauth::fresh_nonce(),
            self.clock.wall_clock_secs(),
        )
    }

    /// Publishes a post and returns its id.
    ///
    /// Unlike paste creation, a refused publish is an error: the push
    /// flow has already uploaded the paste and needs to know the
    /// announcement did not go out.
    pub async fn publish(&self, text: &str) -> Result<String> {
        let url = format!("{}/statuses/update.json", self.base_url);
        let params = [("status", text)];
        let authorization = self.oauth("POST", &url, &params);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .form(&params)
            .send()
            .await
            .map_err(|err| RemoteError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Service {
                service: SERVICE,
                operation: "publish",
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|err| RemoteError::Response {
            service: SERVICE,
            detail: err.to_string(),
        })?;
        let id = post_id(&body).ok_or_else(|| RemoteError::Response {
            service: SERVICE,
            detail: "publish response carries no post id".to_string(),
        })?;
        debug!(post_id = %id, "post-publish");
        Ok(id)
    }

    /// Deletes a post. Returns whether the service confirmed removal.
    ///
    /// An id that is already gone answers with an error status; the
    /// caller sees `false` rather than a hard failure.
    pub async fn destroy(&self, post_id: &str) -> Result<bool> {
        let url = format!("{}/statuses/destroy/{post_id}.json", self.base_url);
        let authorization = self.oauth("POST", &url, &[]);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|err| RemoteError::Http(err.to_string()))?;

        let removed = response.status().is_success();
        debug!(post_id = %post_id, removed, "post-destroy");
        Ok(removed)
    }

    /// Reads recent posts of one account, newest first.
    ///
    /// With `since_id` set, only posts strictly newer than that id come
    /// back, which is how the watcher avoids re-reading old pages.
    pub async fn timeline(
        &self,
        screen_name: &str,
        since_id: Option<u64>,
    ) -> Result<Vec<TimelinePost>> {
        let url = format!("{}/statuses/user_timeline.json", self.base_url);
        let since = since_id.map(|id| id.to_string());
        let mut params: Vec<(&str, &str)> =
            vec![("screen_name", screen_name), ("count", TIMELINE_PAGE)];
        if let Some(since) = since.as_deref() {
            params.push(("since_id", since));
        }
        let authorization = self.oauth("GET", &url, &params);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .query(&params)
            .send()
            .await
            .map_err(|err| RemoteError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Service {
                service: SERVICE,
                operation: "timeline",
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|err| RemoteError::Response {
            service: SERVICE,
            detail: err.to_string(),
        })
    }
}

/// Pulls the post id out of a publish response, preferring the string
/// form so large ids survive untouched.
fn post_id(body: &Value) -> Option<String> {
    if let Some(id) = body.get("id_str").and_then(Value::as_str) {
        return Some(id.to_string());
    }
    body.get("id").and_then(Value::as_u64).map(|id| id.to_string())
}
