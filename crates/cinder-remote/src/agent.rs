//! Secure-messaging agent wrapper.
//!
//! Encryption, signing, and identity are delegated to the user's local
//! agent binary. Each operation shells out once: stdout carries the
//! payload, stderr carries human-oriented diagnostics we mine for
//! signer and author attribution. The agent colors its stderr, so it is
//! ANSI-stripped before any parsing.

use std::path::PathBuf;
use std::process::Output;

use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::error::{RemoteError, Result};

/// Default agent binary, resolved via `PATH`.
pub const DEFAULT_AGENT_PROGRAM: &str = "keybase";

/// Outcome of checking a signed blob.
#[derive(Debug, Clone)]
pub struct Verification {
    /// Whether the signature checked out.
    pub ok: bool,
    /// Who signed, when the agent named them.
    pub signer: Option<String>,
    /// The text that was signed. Empty when `ok` is false.
    pub inner_text: String,
}

/// Outcome of decrypting a blob.
#[derive(Debug, Clone)]
pub struct Opened {
    /// Who authored the ciphertext, when the agent named them.
    ///
    /// `None` means the sender did not sign; callers decide how much to
    /// trust such messages.
    pub author: Option<String>,
    /// Recovered plaintext.
    pub plaintext: String,
}

/// Drives the local agent binary, one subprocess per operation.
#[derive(Debug, Clone)]
pub struct Agent {
    program: PathBuf,
}

struct AgentRun {
    success: bool,
    stdout: String,
    stderr: String,
}

impl AgentRun {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: strip_ansi(&String::from_utf8_lossy(&output.stderr)),
        }
    }
}

impl Agent {
    /// Wraps the default agent binary.
    pub fn new() -> Self {
        Self::with_program(DEFAULT_AGENT_PROGRAM)
    }

    /// Wraps a specific binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<AgentRun> {
        let output = Command::new(&self.program).args(args).output().await.map_err(|err| {
            RemoteError::AgentSpawn(format!("{}: {err}", self.program.display()))
        })?;
        Ok(AgentRun::from_output(output))
    }

    /// Asks whether the agent has a logged-in user.
    pub async fn status(&self) -> Result<bool> {
        let run = self.run(&["status", "--json"]).await?;
        if !run.success {
            return Err(RemoteError::Agent {
                operation: "status",
                detail: run.stderr.trim().to_string(),
            });
        }
        let logged_in = parse_logged_in(&run.stdout)?;
        debug!(logged_in, "agent-status");
        Ok(logged_in)
    }

    /// Checks that `identity` resolves to a known, verifiable user.
    pub async fn lookup(&self, identity: &str) -> Result<bool> {
        let run = self.run(&["id", identity]).await?;
        Ok(run.success)
    }

    /// Encrypts `plaintext` for `recipient`, returning the armored blob.
    pub async fn encrypt(&self, plaintext: &str, recipient: &str) -> Result<String> {
        let run = self.run(&["encrypt", "-m", plaintext, recipient]).await?;
        if !run.success {
            return Err(RemoteError::Agent {
                operation: "encrypt",
                detail: run.stderr.trim().to_string(),
            });
        }
        Ok(run.stdout.trim().to_string())
    }

    /// Signs `text` with the logged-in user's key.
    pub async fn sign(&self, text: &str) -> Result<String> {
        let run = self.run(&["sign", "-m", text]).await?;
        if !run.success {
            return Err(RemoteError::Agent {
                operation: "sign",
                detail: run.stderr.trim().to_string(),
            });
        }
        Ok(run.stdout.trim().to_string())
    }

    /// Checks a signed blob.
    ///
    /// A bad signature is a result, not an error: `ok` comes back false
    /// and the caller decides what to drop.
    pub async fn verify(&self, blob: &str) -> Result<Verification> {
        let run = self.run(&["verify", "-m", blob]).await?;
        if !run.success {
            return Ok(Verification { ok: false, signer: None, inner_text: String::new() });
        }
        Ok(Verification {
            ok: true,
            signer: extract_signer(&run.stderr),
            inner_text: run.stdout.trim().to_string(),
        })
    }

    /// Decrypts a blob addressed to the logged-in user.
    pub async fn decrypt(&self, blob: &str) -> Result<Opened> {
        let run = self.run(&["decrypt", "-m", blob]).await?;
        if !run.success {
            return Err(RemoteError::Agent {
                operation: "decrypt",
                detail: run.stderr.trim().to_string(),
            });
        }
        Ok(Opened { author: extract_author(&run.stderr), plaintext: run.stdout.trim().to_string() })
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_logged_in(raw: &str) -> Result<bool> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|err| RemoteError::Agent {
        operation: "status",
        detail: format!("unparseable status output: {err}"),
    })?;
    value.get("LoggedIn").and_then(serde_json::Value::as_bool).ok_or_else(|| {
        RemoteError::Agent {
            operation: "status",
            detail: "status output has no LoggedIn field".to_string(),
        }
    })
}

/// Strips ANSI escape sequences from colored agent output.
fn strip_ansi(raw: &str) -> String {
    ansi_pattern().replace_all(raw, "").into_owned()
}

fn ansi_pattern() -> Regex {
    #[allow(clippy::expect_used)]
    Regex::new("\x1b\\[[0-9;]*[A-Za-z]").expect("invariant: pattern is statically valid")
}

fn extract_signer(stderr: &str) -> Option<String> {
    capture(r"[Ss]igned by (\S+)", stderr)
}

fn extract_author(stderr: &str) -> Option<String> {
    capture(r"[Aa]uthored by (\S+)", stderr)
}

fn capture(pattern: &str, text: &str) -> Option<String> {
    #[allow(clippy::expect_used)]
    let re = Regex::new(pattern).expect("invariant: pattern is statically valid");
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str().trim_end_matches(['.', ',']).to_string())
}
