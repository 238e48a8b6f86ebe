use crate::models::LocalNotification;
use async_trait::async_trait;
use log::info;
use tokio::sync::mpsc;

/// Schedules an immediate on-device alert.
#[async_trait]
pub trait LocalNotifier: Send + Sync {
    async fn schedule(&self, notification: &LocalNotification) -> anyhow::Result<()>;
}

/// Writes alerts to the log; useful for headless deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl LocalNotifier for LogNotifier {
    async fn schedule(&self, notification: &LocalNotification) -> anyhow::Result<()> {
        info!(
            target: "order_status_watcher",
            "{}: {} {}",
            notification.title,
            notification.body,
            notification.data
        );
        Ok(())
    }
}

/// Forwards alerts to whatever UI owns the receiving end.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<LocalNotification>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<LocalNotification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl LocalNotifier for ChannelNotifier {
    async fn schedule(&self, notification: &LocalNotification) -> anyhow::Result<()> {
        self.tx
            .send(notification.clone())
            .await
            .map_err(|_| anyhow::anyhow!("notification receiver dropped"))
    }
}
