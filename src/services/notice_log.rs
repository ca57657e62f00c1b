use crate::domain::notification::Notice;
use crate::services::notification::provider::NoticeSink;
use std::sync::atomic::{AtomicU64, Ordering};

/// Headless presentation surface for the daemon: every notice is written to
/// the log and then forgotten.
#[derive(Debug, Default)]
pub struct NoticeLog {
    shown: AtomicU64,
}

impl NoticeLog {
    /// Number of notices shown since startup.
    #[must_use]
    pub fn shown(&self) -> u64 {
        self.shown.load(Ordering::Relaxed)
    }
}

impl NoticeSink for NoticeLog {
    fn show(&self, notice: Notice) {
        self.shown.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            key = %notice.key,
            title = notice.title.as_deref().unwrap_or_default(),
            body = %notice.body,
            priority = ?notice.priority,
            "Notification"
        );
    }
}
