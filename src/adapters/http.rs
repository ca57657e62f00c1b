use crate::config::ReceiptConfig;
use crate::domain::notification::NotificationId;
use crate::error::ReceiptError;
use crate::services::notification::provider::ReceiptSender;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Marks notifications read through the backend REST API:
/// `PATCH {api_url}/notifications/{id}/read`.
#[derive(Debug, Clone)]
pub struct HttpReceiptSender {
    client: reqwest::Client,
    api_url: Url,
}

impl HttpReceiptSender {
    /// # Errors
    /// Returns `ReceiptError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ReceiptConfig) -> Result<Self, ReceiptError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self { client, api_url: config.api_url.clone() })
    }

    /// # Errors
    /// Returns `ReceiptError::InvalidApiUrl` if the API URL cannot carry a path.
    pub fn receipt_url(&self, id: &NotificationId) -> Result<Url, ReceiptError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| ReceiptError::InvalidApiUrl(self.api_url.to_string()))?
            .pop_if_empty()
            .extend(["notifications", id.as_str(), "read"]);
        Ok(url)
    }
}

#[async_trait]
impl ReceiptSender for HttpReceiptSender {
    async fn mark_read(&self, id: &NotificationId) -> Result<(), ReceiptError> {
        let url = self.receipt_url(id)?;
        let response = self.client.patch(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReceiptError::Status(status));
        }
        Ok(())
    }
}
