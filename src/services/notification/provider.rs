use crate::domain::notification::{Notice, NotificationId};
use crate::domain::subscriber::SubscriberId;
use crate::error::ReceiptError;
use async_trait::async_trait;

#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Resolves the current subscriber. Consulted once per connection attempt;
    /// `None` means nobody is logged in and no connection should be made.
    async fn current(&self) -> Option<SubscriberId>;
}

#[async_trait]
pub trait ReceiptSender: Send + Sync + std::fmt::Debug {
    /// Marks a notification as read on the server.
    ///
    /// # Errors
    /// Returns `ReceiptError` if the request fails or is rejected.
    async fn mark_read(&self, id: &NotificationId) -> Result<(), ReceiptError>;
}

pub trait NoticeSink: Send + Sync + std::fmt::Debug {
    fn show(&self, notice: Notice);
}
