//! Session controller around the detector.
//!
//! [`OrderStatusWatcher::start`] arms a fresh [`DetectorState`] for one user,
//! subscribes the configured [`ChangeFeed`] and spawns a task that owns the
//! receiving end of the batch channel. Batches are applied one at a time; the
//! notifications each batch yields are handed to both sinks in batch order.
//! [`OrderStatusWatcher::stop`] bumps the session generation before tearing
//! the task down, so nothing delivered afterwards reaches the detector.

use crate::client::feed::{BatchSender, ChangeFeed, Envelope, FeedMessage, Subscription};
use crate::client::http::ReqwestGateway;
use crate::client::poller::PollingChangeFeed;
use crate::client::DocumentStoreGateway;
use crate::config::WatcherConfig;
use crate::detector::DetectorState;
use crate::error::WatcherError;
use crate::events::{Event, SinkKind};
use crate::models::ids::UserId;
use crate::models::{ChangeRecord, NotificationEvent};
use crate::sinks::{LocalNotifier, LogNotifier};
#[cfg(feature = "json-storage")]
use crate::storage::json::JsonFileNotificationLog;
use crate::storage::remote::RemoteNotificationLog;
use crate::storage::NotificationLog;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::{self, Sender};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct OrderStatusWatcher {
    feed: Arc<dyn ChangeFeed>,
    local: Arc<dyn LocalNotifier>,
    log: Arc<dyn NotificationLog>,
    events_tx: Sender<Event>,
    generation: Arc<AtomicU64>,
    session: tokio::sync::Mutex<Option<ActiveSession>>,
    batch_channel_capacity: usize,
    notification_title: String,
}

impl fmt::Debug for OrderStatusWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderStatusWatcher")
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("batch_channel_capacity", &self.batch_channel_capacity)
            .finish()
    }
}

struct ActiveSession {
    user_id: UserId,
    generation: u64,
    state: Arc<Mutex<DetectorState>>,
    subscription: Subscription,
    worker: JoinHandle<()>,
}

impl OrderStatusWatcher {
    pub fn new(
        feed: Arc<dyn ChangeFeed>,
        local: Arc<dyn LocalNotifier>,
        log: Arc<dyn NotificationLog>,
    ) -> Self {
        Self::with_config(feed, local, log, &WatcherConfig::default())
    }

    pub fn with_config(
        feed: Arc<dyn ChangeFeed>,
        local: Arc<dyn LocalNotifier>,
        log: Arc<dyn NotificationLog>,
        config: &WatcherConfig,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            feed,
            local,
            log,
            events_tx: tx,
            generation: Arc::new(AtomicU64::new(0)),
            session: tokio::sync::Mutex::new(None),
            batch_channel_capacity: config.batch_channel_capacity.max(1),
            notification_title: config.notification_title.clone(),
        }
    }

    /// Wires the stock HTTP stack: a polling feed over [`ReqwestGateway`],
    /// log-only local alerts, and a JSON-file log when a directory is
    /// configured, the remote notification log otherwise.
    pub fn from_config(config: WatcherConfig) -> Self {
        let gateway: Arc<dyn DocumentStoreGateway> = Arc::new(ReqwestGateway::with_config(&config));
        Self::with_gateway_and_config(gateway, Arc::new(LogNotifier), config)
    }

    pub fn with_gateway_and_config(
        gateway: Arc<dyn DocumentStoreGateway>,
        local: Arc<dyn LocalNotifier>,
        config: WatcherConfig,
    ) -> Self {
        let feed: Arc<dyn ChangeFeed> = Arc::new(PollingChangeFeed::new(gateway.clone(), &config));
        let log: Arc<dyn NotificationLog> = match config.notification_log_dir {
            #[cfg(feature = "json-storage")]
            Some(ref dir) => Arc::new(JsonFileNotificationLog::new(dir.clone())),
            _ => Arc::new(RemoteNotificationLog::new(gateway)),
        };
        Self::with_config(feed, local, log, &config)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events_tx.subscribe()
    }

    /// Arms the detector for `user_id`. A blank id leaves the watcher untouched.
    /// Starting while another session is live stops that session first.
    pub async fn start(&self, user_id: impl Into<UserId>) -> Result<(), WatcherError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            debug!(target: "order_status_watcher", "Ignoring start without a user id");
            return Ok(());
        }

        let mut slot = self.session.lock().await;
        if let Some(previous) = slot.take() {
            self.teardown(previous);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::channel(self.batch_channel_capacity);
        let state = Arc::new(Mutex::new(DetectorState::with_title(
            self.notification_title.as_str(),
        )));

        let subscription = match self
            .feed
            .subscribe(&user_id, BatchSender::new(generation, tx))
            .await
        {
            Ok(subscription) => subscription,
            Err(e) => {
                error!(target: "order_status_watcher", "Failed to subscribe to orders of {user_id}: {e}");
                return Err(e);
            }
        };

        let worker = SessionWorker {
            user_id: user_id.clone(),
            generation,
            current_generation: self.generation.clone(),
            state: state.clone(),
            local: self.local.clone(),
            log: self.log.clone(),
            events_tx: self.events_tx.clone(),
        };
        let worker = tokio::spawn(worker.run(rx));

        info!(target: "order_status_watcher", "Watching orders of {user_id} (session {generation})");
        let _ = self.events_tx.send(Event::SessionStarted {
            user_id: user_id.clone(),
        });
        *slot = Some(ActiveSession {
            user_id,
            generation,
            state,
            subscription,
            worker,
        });
        Ok(())
    }

    /// Tears the live session down. Calling it while idle does nothing.
    pub async fn stop(&self) {
        let mut slot = self.session.lock().await;
        if let Some(session) = slot.take() {
            self.teardown(session);
        }
    }

    pub async fn is_armed(&self) -> bool {
        self.session.lock().await.is_some()
    }

    pub async fn current_user(&self) -> Option<UserId> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.user_id.clone())
    }

    /// A copy of the live detector state, or a fresh idle one when no session runs.
    pub async fn snapshot(&self) -> DetectorState {
        match self.session.lock().await.as_ref() {
            Some(session) => lock_state(&session.state).clone(),
            None => DetectorState::with_title(self.notification_title.as_str()),
        }
    }

    fn teardown(&self, session: ActiveSession) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        session.subscription.cancel();
        session.worker.abort();
        lock_state(&session.state).reset();
        info!(
            target: "order_status_watcher",
            "Stopped watching orders of {} (session {})",
            session.user_id,
            session.generation
        );
        let _ = self.events_tx.send(Event::SessionStopped {
            user_id: session.user_id,
        });
    }
}

fn lock_state(state: &Mutex<DetectorState>) -> MutexGuard<'_, DetectorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SessionWorker {
    user_id: UserId,
    generation: u64,
    current_generation: Arc<AtomicU64>,
    state: Arc<Mutex<DetectorState>>,
    local: Arc<dyn LocalNotifier>,
    log: Arc<dyn NotificationLog>,
    events_tx: Sender<Event>,
}

impl SessionWorker {
    async fn run(self, mut rx: mpsc::Receiver<Envelope>) {
        while let Some(envelope) = rx.recv().await {
            if envelope.generation != self.generation {
                debug!(
                    target: "order_status_watcher",
                    "Discarding message from session {} in session {}",
                    envelope.generation,
                    self.generation
                );
                continue;
            }
            match envelope.message {
                FeedMessage::Batch(batch) => {
                    let Some(notifications) = self.apply(&batch) else {
                        break;
                    };
                    for notification in notifications {
                        self.dispatch(notification).await;
                    }
                }
                FeedMessage::Error(message) => {
                    warn!(target: "order_status_watcher", "Order feed for {} failed: {message}", self.user_id);
                    let _ = self.events_tx.send(Event::FeedFailed {
                        user_id: self.user_id.clone(),
                        message,
                    });
                }
            }
        }
        debug!(target: "order_status_watcher", "Session {} worker finished", self.generation);
    }

    /// `None` once the session has been stopped.
    fn apply(&self, batch: &[ChangeRecord]) -> Option<Vec<NotificationEvent>> {
        let mut state = lock_state(&self.state);
        if self.current_generation.load(Ordering::SeqCst) != self.generation {
            debug!(target: "order_status_watcher", "Dropping batch delivered after stop");
            return None;
        }
        Some(state.apply(batch))
    }

    async fn dispatch(&self, notification: NotificationEvent) {
        let alert = notification.to_local();
        let (scheduled, persisted) = tokio::join!(
            self.local.schedule(&alert),
            self.log.append(&self.user_id, notification.to_draft())
        );

        if let Err(e) = scheduled {
            self.report_sink_failure(SinkKind::Local, &notification, e);
        }
        if let Err(e) = persisted {
            self.report_sink_failure(SinkKind::Persisted, &notification, e);
        }

        let _ = self.events_tx.send(Event::OrderStatusChanged {
            user_id: self.user_id.clone(),
            notification,
        });
    }

    fn report_sink_failure(&self, sink: SinkKind, notification: &NotificationEvent, e: anyhow::Error) {
        error!(
            target: "order_status_watcher",
            "{sink:?} notification for order {} failed: {e:#}",
            notification.order_id
        );
        let _ = self.events_tx.send(Event::SinkFailed {
            user_id: self.user_id.clone(),
            sink,
            notification: notification.clone(),
            message: e.to_string(),
        });
    }
}
