pub mod enums;
pub mod ids;

use crate::models::enums::ChangeKind;
use crate::models::ids::{NotificationId, OrderId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const STATUS_UPDATED_TITLE: &str = "Order status updated";

/// One entry of a change batch, as delivered by a [`crate::client::feed::ChangeFeed`].
///
/// `order_id` and `status` are optional because snapshots coming off the wire
/// may be incomplete; the detector decides what to do with such records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub order_id: Option<OrderId>,
    pub status: Option<String>,
}

impl ChangeRecord {
    pub fn new(kind: ChangeKind, order_id: impl Into<OrderId>, status: Option<&str>) -> Self {
        Self {
            kind,
            order_id: Some(order_id.into()),
            status: normalize_status(status),
        }
    }

    pub fn added(order_id: impl Into<OrderId>, status: &str) -> Self {
        Self::new(ChangeKind::Added, order_id, Some(status))
    }

    pub fn modified(order_id: impl Into<OrderId>, status: &str) -> Self {
        Self::new(ChangeKind::Modified, order_id, Some(status))
    }

    pub fn removed(order_id: impl Into<OrderId>) -> Self {
        Self::new(ChangeKind::Removed, order_id, None)
    }
}

/// An empty status is treated as missing. Any other string is kept verbatim.
pub fn normalize_status(status: Option<&str>) -> Option<String> {
    status.filter(|s| !s.is_empty()).map(str::to_string)
}

/// A detected status transition, handed to both sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub order_id: OrderId,
    pub previous_status: String,
    pub new_status: String,
    pub title: String,
    pub body: String,
}

impl NotificationEvent {
    pub fn status_changed(
        order_id: OrderId,
        previous_status: String,
        new_status: String,
        title: &str,
    ) -> Self {
        let body = format!("Your order is now {new_status}.");
        Self {
            order_id,
            previous_status,
            new_status,
            title: title.to_string(),
            body,
        }
    }

    pub fn to_local(&self) -> LocalNotification {
        LocalNotification {
            title: self.title.clone(),
            body: self.body.clone(),
            data: json!({
                "orderId": self.order_id.as_ref(),
                "status": self.new_status,
            }),
        }
    }

    pub fn to_draft(&self) -> NotificationDraft {
        NotificationDraft {
            title: self.title.clone(),
            body: self.body.clone(),
            order_id: self.order_id.clone(),
            status: self.new_status.clone(),
        }
    }
}

/// Payload for an immediate on-device alert.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalNotification {
    pub title: String,
    pub body: String,
    pub data: Value,
}

/// A notification about to be appended to a user's log. `read` and
/// `created_at` are filled in by the log itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub title: String,
    pub body: String,
    pub order_id: OrderId,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedNotification {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    pub order_id: OrderId,
    pub status: String,
    pub read: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl PersistedNotification {
    pub fn from_draft(id: NotificationId, draft: NotificationDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            body: draft.body,
            order_id: draft.order_id,
            status: draft.status,
            read: false,
            created_at: Some(created_at),
        }
    }
}

/// An order row as returned by the document store's query endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDocument {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub status: Option<String>,
}
