use crate::models::ids::UserId;
use crate::models::{NotificationDraft, PersistedNotification};
use async_trait::async_trait;

/// A per-user, append-only log of delivered notifications.
#[async_trait]
pub trait NotificationLog: Send + Sync {
    async fn append(
        &self,
        user_id: &UserId,
        draft: NotificationDraft,
    ) -> anyhow::Result<PersistedNotification>;
    /// Newest first.
    async fn list(&self, user_id: &UserId) -> anyhow::Result<Vec<PersistedNotification>>;
    /// Returns how many entries flipped from unread to read.
    async fn mark_all_read(&self, user_id: &UserId) -> anyhow::Result<usize>;
}

pub(crate) fn newest_first(notifications: &mut [PersistedNotification]) {
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(feature = "json-storage")]
pub mod json;
pub mod memory;
pub mod remote;
