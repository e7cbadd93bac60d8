//! Credential vault.
//!
//! All service credentials live in a single JSON file outside the
//! repository. The file carries one personal access token for the paste
//! service and a four-part OAuth 1.0a key set for the micro-blog:
//!
//! ```json
//! {
//!   "paste-token": "ghp_...",
//!   "microblog": {
//!     "consumer-key": "...",
//!     "consumer-secret": "...",
//!     "access-token": "...",
//!     "access-token-secret": "..."
//!   }
//! }
//! ```
//!
//! A missing or malformed vault is fatal at startup. Nothing in this
//! module logs credential material.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::{RemoteError, Result};

/// OAuth 1.0a key set for the micro-blog service.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MicroblogKeys {
    /// Application consumer key.
    pub consumer_key: String,
    /// Application consumer secret.
    pub consumer_secret: String,
    /// User access token.
    pub access_token: String,
    /// User access token secret.
    pub access_token_secret: String,
}

impl fmt::Debug for MicroblogKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicroblogKeys")
            .field("consumer_key", &"<redacted>")
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

/// Parsed contents of the credential vault file.
#[derive(Clone, Deserialize)]
pub struct Vault {
    /// Personal access token for the paste service.
    #[serde(rename = "paste-token")]
    pub paste_token: String,
    /// Key set for the micro-blog service.
    pub microblog: MicroblogKeys,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("paste_token", &"<redacted>")
            .field("microblog", &self.microblog)
            .finish()
    }
}

impl Vault {
    /// Conventional vault location relative to the working directory.
    pub const DEFAULT_PATH: &'static str = "vault/keys.json";

    /// Reads and parses the vault file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| RemoteError::VaultIo {
            path: path.display().to_string(),
            detail: err.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|err| RemoteError::VaultFormat {
            path: path.display().to_string(),
            detail: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    const COMPLETE_VAULT: &str = r#"{
        "paste-token": "ghp_token",
        "microblog": {
            "consumer-key": "ck",
            "consumer-secret": "cs",
            "access-token": "at",
            "access-token-secret": "ats"
        }
    }"#;

    fn write_vault(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp vault");
        file.write_all(contents.as_bytes()).expect("write temp vault");
        file
    }

    #[test]
    fn load_parses_complete_vault() {
        let file = write_vault(COMPLETE_VAULT);

        let vault = Vault::load(file.path()).expect("vault should parse");

        assert_eq!(vault.paste_token, "ghp_token");
        assert_eq!(vault.microblog.consumer_key, "ck");
        assert_eq!(vault.microblog.consumer_secret, "cs");
        assert_eq!(vault.microblog.access_token, "at");
        assert_eq!(vault.microblog.access_token_secret, "ats");
    }

    #[test]
    fn load_tolerates_unknown_fields() {
        let file = write_vault(
            r#"{
                "paste-token": "t",
                "legacy-field": true,
                "microblog": {
                    "consumer-key": "a",
                    "consumer-secret": "b",
                    "access-token": "c",
                    "access-token-secret": "d"
                }
            }"#,
        );

        assert!(Vault::load(file.path()).is_ok());
    }

    #[test]
    fn load_rejects_missing_key_fields() {
        let file = write_vault(r#"{"paste-token": "t", "microblog": {"consumer-key": "a"}}"#);

        let err = Vault::load(file.path()).expect_err("incomplete vault must fail");
        assert!(matches!(err, RemoteError::VaultFormat { .. }));
    }

    #[test]
    fn load_reports_missing_file_as_io() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let missing = dir.path().join("absent.json");

        let err = Vault::load(&missing).expect_err("missing vault must fail");
        assert!(matches!(err, RemoteError::VaultIo { .. }));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let file = write_vault(COMPLETE_VAULT);
        let vault = Vault::load(file.path()).expect("vault should parse");

        let rendered = format!("{vault:?}");

        assert!(!rendered.contains("ghp_token"));
        assert!(!rendered.contains("cs"));
        assert!(rendered.contains("<redacted>"));
    }
}
