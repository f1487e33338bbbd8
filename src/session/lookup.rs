use async_trait::async_trait;
use thiserror::Error;

use super::SessionRecord;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("session request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("session request returned {0}")]
    Status(reqwest::StatusCode),
}

/// Fetches a single session from the host
#[async_trait]
pub trait SessionLookup: Send + Sync {
    /// `Ok(None)` when the host does not know the session
    async fn lookup(&self, id: &str) -> Result<Option<SessionRecord>, LookupError>;
}
