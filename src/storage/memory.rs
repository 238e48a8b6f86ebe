use crate::models::ids::{NotificationId, UserId};
use crate::models::{NotificationDraft, PersistedNotification};
use crate::storage::{newest_first, NotificationLog};
use crate::utils::auto_id;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct InMemoryNotificationLog {
    data: RwLock<HashMap<UserId, Vec<PersistedNotification>>>,
}

impl InMemoryNotificationLog {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryNotificationLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationLog for InMemoryNotificationLog {
    async fn append(
        &self,
        user_id: &UserId,
        draft: NotificationDraft,
    ) -> anyhow::Result<PersistedNotification> {
        let entry = PersistedNotification::from_draft(NotificationId::from(auto_id()), draft, Utc::now());
        self.data
            .write()
            .map_err(|_| anyhow::anyhow!("notification log lock poisoned"))?
            .entry(user_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    async fn list(&self, user_id: &UserId) -> anyhow::Result<Vec<PersistedNotification>> {
        let mut entries = self
            .data
            .read()
            .map_err(|_| anyhow::anyhow!("notification log lock poisoned"))?
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        newest_first(&mut entries);
        Ok(entries)
    }

    async fn mark_all_read(&self, user_id: &UserId) -> anyhow::Result<usize> {
        let mut data = self
            .data
            .write()
            .map_err(|_| anyhow::anyhow!("notification log lock poisoned"))?;
        let mut flipped = 0;
        for entry in data.get_mut(user_id).into_iter().flatten() {
            if !entry.read {
                entry.read = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ids::OrderId;

    fn draft(order: &str, status: &str) -> NotificationDraft {
        NotificationDraft {
            title: "Order status updated".to_string(),
            body: format!("Your order is now {status}."),
            order_id: OrderId::from(order),
            status: status.to_string(),
        }
    }

    #[tokio::test]
    async fn logs_are_per_user_and_newest_first() {
        let log = InMemoryNotificationLog::new();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");

        log.append(&alice, draft("o1", "processing")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        log.append(&alice, draft("o1", "shipped")).await.unwrap();
        log.append(&bob, draft("o2", "delivered")).await.unwrap();

        let entries = log.list(&alice).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, "shipped");
        assert!(entries.iter().all(|e| !e.read));
        assert_eq!(log.list(&bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mark_all_read_counts_flipped_entries() {
        let log = InMemoryNotificationLog::new();
        let user = UserId::from("alice");
        log.append(&user, draft("o1", "shipped")).await.unwrap();
        log.append(&user, draft("o2", "shipped")).await.unwrap();

        assert_eq!(log.mark_all_read(&user).await.unwrap(), 2);
        assert_eq!(log.mark_all_read(&user).await.unwrap(), 0);
        assert_eq!(log.mark_all_read(&UserId::from("nobody")).await.unwrap(), 0);
        assert!(log.list(&user).await.unwrap().iter().all(|e| e.read));
    }
}
