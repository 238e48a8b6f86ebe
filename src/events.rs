use crate::models::ids::UserId;
use crate::models::NotificationEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Local,
    Persisted,
}

#[derive(Debug, Clone)]
pub enum Event {
    SessionStarted { user_id: UserId },
    SessionStopped { user_id: UserId },
    OrderStatusChanged { user_id: UserId, notification: NotificationEvent },
    FeedFailed { user_id: UserId, message: String },
    SinkFailed { user_id: UserId, sink: SinkKind, notification: NotificationEvent, message: String },
}
