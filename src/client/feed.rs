//! The boundary between a change transport and the watcher.
//!
//! A [`ChangeFeed`] is handed a [`BatchSender`] when a session starts and pushes
//! ordered batches through it for as long as the returned [`Subscription`] lives.

use crate::error::WatcherError;
use crate::models::ids::UserId;
use crate::models::ChangeRecord;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub enum FeedMessage {
    Batch(Vec<ChangeRecord>),
    Error(String),
}

/// A feed message stamped with the session it was produced for.
#[derive(Debug)]
pub struct Envelope {
    pub generation: u64,
    pub message: FeedMessage,
}

#[derive(Debug, Clone)]
pub struct BatchSender {
    generation: u64,
    tx: mpsc::Sender<Envelope>,
}

impl BatchSender {
    pub fn new(generation: u64, tx: mpsc::Sender<Envelope>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn send_batch(&self, batch: Vec<ChangeRecord>) -> Result<(), WatcherError> {
        self.send(FeedMessage::Batch(batch)).await
    }

    pub async fn send_error(&self, message: impl Into<String>) -> Result<(), WatcherError> {
        self.send(FeedMessage::Error(message.into())).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, message: FeedMessage) -> Result<(), WatcherError> {
        self.tx
            .send(Envelope {
                generation: self.generation,
                message,
            })
            .await
            .map_err(|_| WatcherError::FeedClosed)
    }
}

/// Keeps a feed's background work alive. Dropping it cancels the work.
#[derive(Debug, Default)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// For feeds that push from outside any task of their own.
    pub fn detached() -> Self {
        Self { task: None }
    }

    pub fn cancel(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.abort();
    }
}

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(
        &self,
        user_id: &UserId,
        batches: BatchSender,
    ) -> Result<Subscription, WatcherError>;
}

/// A feed driven by the embedding application, for transports that already
/// deliver snapshot changes through callbacks of their own.
#[derive(Default)]
pub struct ManualFeed {
    current: Mutex<Option<(UserId, BatchSender)>>,
}

impl ManualFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sender of the most recent subscription, if any.
    pub fn sender(&self) -> Option<BatchSender> {
        self.lock().as_ref().map(|(_, tx)| tx.clone())
    }

    pub fn subscribed_user(&self) -> Option<UserId> {
        self.lock().as_ref().map(|(user, _)| user.clone())
    }

    pub async fn push(&self, batch: Vec<ChangeRecord>) -> Result<(), WatcherError> {
        let tx = self.sender().ok_or(WatcherError::FeedClosed)?;
        tx.send_batch(batch).await
    }

    pub async fn fail(&self, message: impl Into<String>) -> Result<(), WatcherError> {
        let tx = self.sender().ok_or(WatcherError::FeedClosed)?;
        tx.send_error(message).await
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<(UserId, BatchSender)>> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ChangeFeed for ManualFeed {
    async fn subscribe(
        &self,
        user_id: &UserId,
        batches: BatchSender,
    ) -> Result<Subscription, WatcherError> {
        *self.lock() = Some((user_id.clone(), batches));
        Ok(Subscription::detached())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_stamps_generation() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = BatchSender::new(7, tx);

        sender
            .send_batch(vec![ChangeRecord::added("A", "pending")])
            .await
            .unwrap();
        let envelope = rx.recv().await.unwrap();

        assert_eq!(envelope.generation, 7);
        assert!(matches!(envelope.message, FeedMessage::Batch(ref b) if b.len() == 1));
    }

    #[tokio::test]
    async fn closed_receiver_reports_feed_closed() {
        let (tx, rx) = mpsc::channel(1);
        let sender = BatchSender::new(1, tx);
        drop(rx);

        assert!(sender.is_closed());
        assert!(matches!(
            sender.send_batch(Vec::new()).await,
            Err(WatcherError::FeedClosed)
        ));
    }

    #[tokio::test]
    async fn dropping_subscription_aborts_task() {
        let task = tokio::spawn(std::future::pending::<()>());
        let abort = task.abort_handle();
        drop(Subscription::from_task(task));
        for _ in 0..10 {
            if abort.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(abort.is_finished());
    }

    #[tokio::test]
    async fn manual_feed_without_subscriber_is_closed() {
        let feed = ManualFeed::new();
        assert!(matches!(feed.push(Vec::new()).await, Err(WatcherError::FeedClosed)));
    }
}
