//! Error types for deletion-job payload handling.
//!
//! Every variant means the payload (or the job being built) can never become
//! valid by waiting, so consumers treat all of these as permanent: log and
//! discard, never retry.

use thiserror::Error;

/// Convenience alias for payload operations.
pub type Result<T> = std::result::Result<T, PayloadError>;

/// Errors from encoding or decoding a deletion-job payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Payload did not split into exactly three delimiter-separated fields.
    #[error("payload has {found} field(s), expected 3")]
    FieldCount {
        /// Number of fields the payload split into.
        found: usize,
    },

    /// One of the three fields is empty.
    #[error("payload field {index} is empty")]
    EmptyField {
        /// Zero-based wire position: 0 kind, 1 artifact id, 2 expiry.
        index: usize,
    },

    /// Expiry field is not an unsigned integer.
    #[error("expiry timestamp is not an integer: {field:?}")]
    Timestamp {
        /// The offending field text.
        field: String,
    },

    /// Kind tag matches none of the known artifact kinds.
    #[error("unknown artifact kind: {tag:?}")]
    UnknownKind {
        /// The offending kind tag.
        tag: String,
    },

    /// Artifact id would corrupt the wire format.
    #[error("artifact id {id:?} contains the payload delimiter")]
    DelimiterInId {
        /// The rejected artifact id.
        id: String,
    },
}
