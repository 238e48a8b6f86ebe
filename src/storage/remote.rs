use crate::client::DocumentStoreGateway;
use crate::models::ids::{NotificationId, UserId};
use crate::models::{NotificationDraft, PersistedNotification};
use crate::storage::{newest_first, NotificationLog};
use crate::utils::auto_id;
use async_trait::async_trait;
use std::sync::Arc;

/// Appends to `users/{uid}/notifications` in the hosted document store.
pub struct RemoteNotificationLog {
    gateway: Arc<dyn DocumentStoreGateway>,
}

impl RemoteNotificationLog {
    pub fn new(gateway: Arc<dyn DocumentStoreGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl NotificationLog for RemoteNotificationLog {
    async fn append(
        &self,
        user_id: &UserId,
        draft: NotificationDraft,
    ) -> anyhow::Result<PersistedNotification> {
        let id = NotificationId::from(auto_id());
        let entry = self.gateway.create_notification(user_id, &id, &draft).await?;
        Ok(entry)
    }

    async fn list(&self, user_id: &UserId) -> anyhow::Result<Vec<PersistedNotification>> {
        let mut entries = self.gateway.list_notifications(user_id).await?;
        // the query already orders by createdAt; entries still missing a
        // server timestamp sort last
        newest_first(&mut entries);
        Ok(entries)
    }

    async fn mark_all_read(&self, user_id: &UserId) -> anyhow::Result<usize> {
        let entries = self.gateway.list_notifications(user_id).await?;
        let mut flipped = 0;
        for entry in entries.iter().filter(|e| !e.read) {
            self.gateway.mark_notification_read(user_id, &entry.id).await?;
            flipped += 1;
        }
        Ok(flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WatcherError;
    use crate::models::ids::OrderId;
    use crate::models::OrderDocument;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGateway {
        created: Mutex<Vec<(UserId, NotificationId)>>,
        marked: Mutex<Vec<NotificationId>>,
    }

    fn stored(id: &str, read: bool, secs: i64) -> PersistedNotification {
        PersistedNotification {
            id: NotificationId::from(id),
            title: "Order status updated".to_string(),
            body: "Your order is now shipped.".to_string(),
            order_id: OrderId::from("o1"),
            status: "shipped".to_string(),
            read,
            created_at: Utc.timestamp_opt(secs, 0).single(),
        }
    }

    #[async_trait]
    impl DocumentStoreGateway for RecordingGateway {
        async fn list_user_orders(&self, _user_id: &UserId) -> Result<Vec<OrderDocument>, WatcherError> {
            Ok(Vec::new())
        }

        async fn create_notification(
            &self,
            user_id: &UserId,
            notification_id: &NotificationId,
            draft: &NotificationDraft,
        ) -> Result<PersistedNotification, WatcherError> {
            self.created
                .lock()
                .unwrap()
                .push((user_id.clone(), notification_id.clone()));
            Ok(PersistedNotification::from_draft(
                notification_id.clone(),
                draft.clone(),
                Utc::now(),
            ))
        }

        async fn list_notifications(
            &self,
            _user_id: &UserId,
        ) -> Result<Vec<PersistedNotification>, WatcherError> {
            Ok(vec![stored("old", true, 10), stored("new", false, 20), stored("mid", false, 15)])
        }

        async fn mark_notification_read(
            &self,
            _user_id: &UserId,
            notification_id: &NotificationId,
        ) -> Result<(), WatcherError> {
            self.marked.lock().unwrap().push(notification_id.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn append_generates_auto_id() {
        let gateway = Arc::new(RecordingGateway::default());
        let log = RemoteNotificationLog::new(gateway.clone());
        let draft = NotificationDraft {
            title: "Order status updated".to_string(),
            body: "Your order is now shipped.".to_string(),
            order_id: OrderId::from("o1"),
            status: "shipped".to_string(),
        };

        let entry = log.append(&UserId::from("u1"), draft).await.unwrap();

        let created = gateway.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].1, entry.id);
        assert_eq!(entry.id.len(), crate::utils::AUTO_ID_LEN);
    }

    #[tokio::test]
    async fn lists_newest_first_and_marks_only_unread() {
        let gateway = Arc::new(RecordingGateway::default());
        let log = RemoteNotificationLog::new(gateway.clone());
        let user = UserId::from("u1");

        let ids: Vec<String> = log
            .list(&user)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id.0)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        assert_eq!(log.mark_all_read(&user).await.unwrap(), 2);
        let marked = gateway.marked.lock().unwrap();
        assert_eq!(marked.len(), 2);
        assert!(!marked.iter().any(|id| id.as_ref() == "old"));
    }
}
