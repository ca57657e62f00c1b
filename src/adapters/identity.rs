use crate::domain::subscriber::SubscriberId;
use crate::error::IdentityError;
use crate::services::notification::provider::IdentityProvider;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

/// Identity fixed at startup, e.g. from the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<SubscriberId>);

impl StaticIdentity {
    #[must_use]
    pub fn new(raw: Option<&str>) -> Self {
        Self(raw.and_then(SubscriberId::parse))
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current(&self) -> Option<SubscriberId> {
        self.0.clone()
    }
}

/// Reads the logged-in user from a JSON session file on every attempt, so a
/// logout or a user switch is picked up by the next reconnect.
#[derive(Debug, Clone)]
pub struct SessionFileIdentity {
    path: PathBuf,
}

impl SessionFileIdentity {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<Option<SubscriberId>, IdentityError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session: Value = serde_json::from_str(&contents)?;
        Ok(SubscriberId::from_session(&session))
    }
}

#[async_trait]
impl IdentityProvider for SessionFileIdentity {
    async fn current(&self) -> Option<SubscriberId> {
        match self.read().await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::error!(error = %e, path = %self.path.display(), "Failed to load session");
                None
            }
        }
    }
}
