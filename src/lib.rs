pub mod client;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod models;
pub mod parsing;
pub mod sinks;
pub mod storage;
pub mod utils;
pub mod watcher;

pub use client::feed::{BatchSender, ChangeFeed, FeedMessage, ManualFeed, Subscription};
pub use client::http::ReqwestGateway;
pub use client::poller::PollingChangeFeed;
pub use client::DocumentStoreGateway;
pub use config::{WatcherConfig, WatcherConfigBuilder};
pub use detector::{reconcile, DetectorState};
pub use error::WatcherError;
pub use events::{Event, SinkKind};
pub use models::enums::ChangeKind;
pub use models::ids::{NotificationId, OrderId, UserId};
pub use models::{ChangeRecord, NotificationEvent};
pub use sinks::{ChannelNotifier, LocalNotifier, LogNotifier};
pub use storage::NotificationLog;
pub use watcher::OrderStatusWatcher;
