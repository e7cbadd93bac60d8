//! Deletion job type and its `~`-delimited wire codec.

use std::{fmt, str::FromStr};

use crate::error::{PayloadError, Result};

/// Which remote service owns an artifact id.
///
/// The wire tags (`paste`, `post`) are a shared contract with non-Rust peers
/// already producing and consuming this queue; they must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Paste-store entry holding the encrypted message body.
    Paste,
    /// Micro-blog post announcing the paste id.
    Post,
}

impl ArtifactKind {
    /// Wire tag for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paste => "paste",
            Self::Post => "post",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = PayloadError;

    /// Tags are matched exactly: no case folding, no whitespace trimming.
    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "paste" => Ok(Self::Paste),
            "post" => Ok(Self::Post),
            other => Err(PayloadError::UnknownKind { tag: other.to_string() }),
        }
    }
}

/// One unit of expiry work: delete `artifact_id` from the service identified
/// by `kind` once `expires_at` has passed.
///
/// # Invariants
///
/// - `artifact_id` is non-empty and contains no [`DeletionJob::DELIMITER`].
///   Enforced by [`DeletionJob::new`] and re-checked on decode, so every
///   constructed job has a round-trippable wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionJob {
    /// Owning service for the artifact id.
    pub kind: ArtifactKind,
    /// Opaque id assigned by the service at creation time.
    pub artifact_id: String,
    /// Absolute UNIX timestamp (seconds) after which the artifact is stale.
    pub expires_at: u64,
}

impl DeletionJob {
    /// Field separator in the wire payload.
    pub const DELIMITER: char = '~';

    /// Build a job, rejecting artifact ids that cannot survive the wire
    /// format.
    ///
    /// # Errors
    ///
    /// - `PayloadError::EmptyField` if `artifact_id` is empty
    /// - `PayloadError::DelimiterInId` if `artifact_id` contains `~`
    pub fn new(kind: ArtifactKind, artifact_id: impl Into<String>, expires_at: u64) -> Result<Self> {
        let artifact_id = artifact_id.into();
        if artifact_id.is_empty() {
            return Err(PayloadError::EmptyField { index: 1 });
        }
        if artifact_id.contains(Self::DELIMITER) {
            return Err(PayloadError::DelimiterInId { id: artifact_id });
        }
        Ok(Self { kind, artifact_id, expires_at })
    }

    /// Encode into the wire payload: `kind~artifact_id~expires_at`.
    #[must_use]
    pub fn payload(&self) -> String {
        format!(
            "{kind}{d}{id}{d}{at}",
            kind = self.kind,
            d = Self::DELIMITER,
            id = self.artifact_id,
            at = self.expires_at,
        )
    }

    /// True once the expiry instant has been reached.
    ///
    /// The boundary is inclusive: a job expiring exactly now is already
    /// expired.
    #[must_use]
    pub fn is_expired(&self, now_unix: u64) -> bool {
        self.expires_at <= now_unix
    }

    /// Seconds until expiry, zero if already expired.
    #[must_use]
    pub fn remaining_secs(&self, now_unix: u64) -> u64 {
        self.expires_at.saturating_sub(now_unix)
    }
}

impl FromStr for DeletionJob {
    type Err = PayloadError;

    /// Decode a wire payload.
    ///
    /// Decoding is strict: exactly three fields, none empty, integer expiry,
    /// known kind tag. Anything else is permanently malformed - it cannot
    /// become valid by waiting, so consumers discard instead of retrying.
    fn from_str(payload: &str) -> Result<Self> {
        let fields: Vec<&str> = payload.split(Self::DELIMITER).collect();
        if fields.len() != 3 {
            return Err(PayloadError::FieldCount { found: fields.len() });
        }
        if let Some(index) = fields.iter().position(|field| field.is_empty()) {
            return Err(PayloadError::EmptyField { index });
        }

        let kind: ArtifactKind = fields[0].parse()?;
        let expires_at: u64 = fields[2]
            .parse()
            .map_err(|_| PayloadError::Timestamp { field: fields[2].to_string() })?;

        Ok(Self { kind, artifact_id: fields[1].to_string(), expires_at })
    }
}

impl fmt::Display for DeletionJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} expires at {}", self.kind, self.artifact_id, self.expires_at)
    }
}
