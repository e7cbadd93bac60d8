//! Dispatch seams between the relay loops and the remote services.

use async_trait::async_trait;
use cinder_proto::ArtifactKind;

use crate::agent::{Agent, Opened, Verification};
use crate::error::Result;
use crate::microblog::MicroblogClient;
use crate::paste::PasteClient;

/// Routes a delete request to the service that owns the artifact kind.
///
/// The expiry loop depends on this seam rather than on the concrete
/// clients, so tests can observe deletes without touching any network.
#[async_trait]
pub trait Deleter: Send + Sync {
    /// Attempts to remove one artifact. Returns whether the owning
    /// service confirmed removal.
    async fn destroy(&self, kind: ArtifactKind, artifact_id: &str) -> Result<bool>;
}

/// Production dispatch over the real paste and micro-blog clients.
pub struct RemoteDeleter {
    paste: PasteClient,
    microblog: MicroblogClient,
}

impl RemoteDeleter {
    /// Bundles the two artifact clients.
    pub fn new(paste: PasteClient, microblog: MicroblogClient) -> Self {
        Self { paste, microblog }
    }
}

#[async_trait]
impl Deleter for RemoteDeleter {
    async fn destroy(&self, kind: ArtifactKind, artifact_id: &str) -> Result<bool> {
        match kind {
            ArtifactKind::Paste => self.paste.destroy(artifact_id).await,
            ArtifactKind::Post => self.microblog.destroy(artifact_id).await,
        }
    }
}

/// Retrieves and opens sealed messages.
///
/// The ingest loop depends on this seam rather than on the concrete
/// paste client and agent, so tests can drive every skip branch
/// without a network or a keyring.
#[async_trait]
pub trait Opener: Send + Sync {
    /// Whether the agent has a logged-in user to open messages for.
    async fn status(&self) -> Result<bool>;

    /// Fetches the sealed blob; `None` when the paste is gone.
    async fn fetch(&self, artifact_id: &str) -> Result<Option<String>>;

    /// Checks the signature on a sealed blob.
    async fn verify(&self, blob: &str) -> Result<Verification>;

    /// Decrypts a verified blob for the local user.
    async fn decrypt(&self, blob: &str) -> Result<Opened>;
}

/// Production opener over the real paste client and agent.
pub struct RemoteOpener {
    paste: PasteClient,
    agent: Agent,
}

impl RemoteOpener {
    /// Bundles the paste client and the local agent.
    pub fn new(paste: PasteClient, agent: Agent) -> Self {
        Self { paste, agent }
    }
}

#[async_trait]
impl Opener for RemoteOpener {
    async fn status(&self) -> Result<bool> {
        self.agent.status().await
    }

    async fn fetch(&self, artifact_id: &str) -> Result<Option<String>> {
        self.paste.fetch(artifact_id).await
    }

    async fn verify(&self, blob: &str) -> Result<Verification> {
        self.agent.verify(blob).await
    }

    async fn decrypt(&self, blob: &str) -> Result<Opened> {
        self.agent.decrypt(blob).await
    }
}
