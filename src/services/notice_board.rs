use crate::domain::notification::Notice;
use crate::services::notification::provider::NoticeSink;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory presentation surface. Notices stay until dismissed; showing a
/// notice whose key is already visible replaces it in place.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeBoard {
    fn lock(&self) -> MutexGuard<'_, Vec<Notice>> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Visible notices, oldest first.
    #[must_use]
    pub fn visible(&self) -> Vec<Notice> {
        self.lock().clone()
    }

    pub fn dismiss(&self, key: &str) -> bool {
        let mut notices = self.lock();
        let before = notices.len();
        notices.retain(|n| n.key != key);
        notices.len() != before
    }
}

impl NoticeSink for NoticeBoard {
    fn show(&self, notice: Notice) {
        tracing::info!(
            key = %notice.key,
            title = notice.title.as_deref().unwrap_or_default(),
            body = %notice.body,
            priority = ?notice.priority,
            "Showing notice"
        );

        let mut notices = self.lock();
        if let Some(existing) = notices.iter_mut().find(|n| n.key == notice.key) {
            *existing = notice;
        } else {
            notices.push(notice);
        }
    }
}
