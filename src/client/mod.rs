use crate::error::WatcherError;
use crate::models::ids::{NotificationId, UserId};
use crate::models::{NotificationDraft, OrderDocument, PersistedNotification};
use async_trait::async_trait;

/// Calls into the hosted document store that backs orders and notifications.
#[async_trait]
pub trait DocumentStoreGateway: Send + Sync {
    async fn list_user_orders(&self, user_id: &UserId) -> Result<Vec<OrderDocument>, WatcherError>;
    async fn create_notification(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
        draft: &NotificationDraft,
    ) -> Result<PersistedNotification, WatcherError>;
    async fn list_notifications(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<PersistedNotification>, WatcherError>;
    async fn mark_notification_read(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), WatcherError>;
}

pub mod feed;
pub mod http;
pub mod poller;
pub mod urls;
