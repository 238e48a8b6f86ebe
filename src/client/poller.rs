use crate::client::feed::{BatchSender, ChangeFeed, Subscription};
use crate::client::DocumentStoreGateway;
use crate::config::WatcherConfig;
use crate::error::WatcherError;
use crate::models::enums::ChangeKind;
use crate::models::ids::{OrderId, UserId};
use crate::models::{ChangeRecord, OrderDocument};
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

type Snapshot = HashMap<OrderId, Option<String>>;

/// Emulates a snapshot listener by re-running the owner query on an interval.
pub struct PollingChangeFeed {
    gateway: Arc<dyn DocumentStoreGateway>,
    polling_interval: Duration,
    error_retry_delay: Duration,
}

impl PollingChangeFeed {
    pub fn new(gateway: Arc<dyn DocumentStoreGateway>, config: &WatcherConfig) -> Self {
        Self {
            gateway,
            polling_interval: config.polling_interval,
            error_retry_delay: config.error_retry_delay,
        }
    }
}

#[async_trait]
impl ChangeFeed for PollingChangeFeed {
    async fn subscribe(
        &self,
        user_id: &UserId,
        batches: BatchSender,
    ) -> Result<Subscription, WatcherError> {
        let poller = OrderPoller {
            gateway: self.gateway.clone(),
            user_id: user_id.clone(),
            batches,
            polling_interval: self.polling_interval,
            error_retry_delay: self.error_retry_delay,
            saved_orders: None,
        };
        Ok(Subscription::from_task(tokio::spawn(poller.start())))
    }
}

pub struct OrderPoller {
    pub gateway: Arc<dyn DocumentStoreGateway>,
    pub user_id: UserId,
    pub batches: BatchSender,
    pub polling_interval: Duration,
    pub error_retry_delay: Duration,

    // State
    pub saved_orders: Option<Snapshot>,
}

impl OrderPoller {
    pub async fn start(mut self) {
        debug!(
            target: "order_status_watcher",
            "Starting order polling for user {}",
            self.user_id
        );

        loop {
            let orders = match self.gateway.list_user_orders(&self.user_id).await {
                Ok(orders) => orders,
                Err(e) => {
                    log::error!(target: "order_status_watcher", "Order query failed: {e}. Retrying in {:?}...", self.error_retry_delay);
                    if self.batches.send_error(e.to_string()).await.is_err() {
                        break;
                    }
                    sleep(self.error_retry_delay).await;
                    continue;
                }
            };

            if let Some(batch) = self.next_batch(&orders) {
                if self.batches.send_batch(batch).await.is_err() {
                    break;
                }
            }

            sleep(self.polling_interval).await;
        }

        debug!(
            target: "order_status_watcher",
            "Order polling for user {} ended, watcher went away",
            self.user_id
        );
    }

    /// Diffs the latest query result against the previous one. The first
    /// result is always delivered; later ones only when something changed.
    pub fn next_batch(&mut self, orders: &[OrderDocument]) -> Option<Vec<ChangeRecord>> {
        let batch = diff_snapshots(self.saved_orders.as_ref(), orders);
        let first = self.saved_orders.is_none();
        self.saved_orders = Some(
            orders
                .iter()
                .map(|o| (o.id.clone(), o.status.clone()))
                .collect(),
        );
        if first || !batch.is_empty() {
            Some(batch)
        } else {
            None
        }
    }
}

pub fn diff_snapshots(previous: Option<&Snapshot>, current: &[OrderDocument]) -> Vec<ChangeRecord> {
    let Some(previous) = previous else {
        return current
            .iter()
            .map(|o| record(ChangeKind::Added, o.id.clone(), o.status.clone()))
            .collect();
    };

    let mut batch = Vec::new();
    for order in current {
        match previous.get(&order.id) {
            None => batch.push(record(ChangeKind::Added, order.id.clone(), order.status.clone())),
            Some(status) if *status != order.status => {
                batch.push(record(ChangeKind::Modified, order.id.clone(), order.status.clone()))
            }
            Some(_) => {}
        }
    }

    let mut removed: Vec<(&OrderId, &Option<String>)> = previous
        .iter()
        .filter(|(id, _)| !current.iter().any(|o| &o.id == *id))
        .collect();
    removed.sort_by(|a, b| a.0.cmp(b.0));
    for (id, status) in removed {
        batch.push(record(ChangeKind::Removed, id.clone(), status.clone()));
    }
    batch
}

fn record(kind: ChangeKind, order_id: OrderId, status: Option<String>) -> ChangeRecord {
    ChangeRecord {
        kind,
        order_id: Some(order_id),
        status,
    }
}
