use crate::models::ids::{NotificationId, UserId};
use crate::models::{NotificationDraft, PersistedNotification};
use crate::storage::{newest_first, NotificationLog};
use crate::utils::auto_id;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// One JSON array per user, stored as `{dir}/{user}.json`.
pub struct JsonFileNotificationLog {
    dir: PathBuf,
    file_lock: Mutex<()>,
}

impl JsonFileNotificationLog {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            file_lock: Mutex::new(()),
        }
    }

    fn path_for(&self, user_id: &UserId) -> PathBuf {
        self.dir
            .join(format!("{}.json", urlencoding::encode(user_id)))
    }

    async fn load(&self, user_id: &UserId) -> anyhow::Result<Vec<PersistedNotification>> {
        let path = self.path_for(user_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).await?;
        let data = serde_json::from_str(&content)?;
        Ok(data)
    }

    async fn save(
        &self,
        user_id: &UserId,
        data: &[PersistedNotification],
    ) -> anyhow::Result<()> {
        if !self.dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.dir).await?;
        }
        let serialized = serde_json::to_string(data)?;
        fs::write(self.path_for(user_id), serialized).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationLog for JsonFileNotificationLog {
    async fn append(
        &self,
        user_id: &UserId,
        draft: NotificationDraft,
    ) -> anyhow::Result<PersistedNotification> {
        let _guard = self.file_lock.lock().await;
        let mut entries = self.load(user_id).await?;
        let entry = PersistedNotification::from_draft(NotificationId::from(auto_id()), draft, Utc::now());
        entries.push(entry.clone());
        self.save(user_id, &entries).await?;
        Ok(entry)
    }

    async fn list(&self, user_id: &UserId) -> anyhow::Result<Vec<PersistedNotification>> {
        let _guard = self.file_lock.lock().await;
        let mut entries = self.load(user_id).await?;
        newest_first(&mut entries);
        Ok(entries)
    }

    async fn mark_all_read(&self, user_id: &UserId) -> anyhow::Result<usize> {
        let _guard = self.file_lock.lock().await;
        let mut entries = self.load(user_id).await?;
        let mut flipped = 0;
        for entry in entries.iter_mut().filter(|e| !e.read) {
            entry.read = true;
            flipped += 1;
        }
        if flipped > 0 {
            self.save(user_id, &entries).await?;
        }
        Ok(flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ids::OrderId;

    fn draft(status: &str) -> NotificationDraft {
        NotificationDraft {
            title: "Order status updated".to_string(),
            body: format!("Your order is now {status}."),
            order_id: OrderId::from("o1"),
            status: status.to_string(),
        }
    }

    #[tokio::test]
    async fn survives_reopen_and_lists_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let user = UserId::from("user/1");

        let log = JsonFileNotificationLog::new(dir.path().join("notifications"));
        log.append(&user, draft("processing")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let latest = log.append(&user, draft("shipped")).await.unwrap();
        drop(log);

        let reopened = JsonFileNotificationLog::new(dir.path().join("notifications"));
        let entries = reopened.list(&user).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], latest);
        assert_eq!(entries[1].status, "processing");
    }

    #[tokio::test]
    async fn mark_all_read_persists() {
        let dir = tempfile::tempdir().unwrap();
        let user = UserId::from("alice");
        let log = JsonFileNotificationLog::new(dir.path().to_path_buf());

        assert_eq!(log.mark_all_read(&user).await.unwrap(), 0);
        log.append(&user, draft("shipped")).await.unwrap();
        assert_eq!(log.mark_all_read(&user).await.unwrap(), 1);

        let reopened = JsonFileNotificationLog::new(dir.path().to_path_buf());
        assert!(reopened.list(&user).await.unwrap()[0].read);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn listing_during_appends_never_sees_a_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = std::sync::Arc::new(JsonFileNotificationLog::new(dir.path().to_path_buf()));
        let user = UserId::from("alice");

        let writer = {
            let log = log.clone();
            let user = user.clone();
            tokio::spawn(async move {
                for i in 0..30 {
                    log.append(&user, draft(&format!("step-{i}"))).await.unwrap();
                }
            })
        };

        let mut last = 0;
        while !writer.is_finished() {
            let entries = log.list(&user).await.unwrap();
            assert!(entries.len() >= last);
            last = entries.len();
        }
        writer.await.unwrap();
        assert_eq!(log.list(&user).await.unwrap().len(), 30);
    }
}
