use order_status_watcher::{ChannelNotifier, OrderStatusWatcher, ReqwestGateway, WatcherConfig};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let user_id =
        std::env::var("WATCH_USER_ID").expect("WATCH_USER_ID environment variable required");

    let config = WatcherConfig::builder()
        .base_url("http://localhost:8080")
        .project_id("demo-shop")
        .user_agent("StorefrontWatcher/1.0 (Rust)")
        .polling_interval(Duration::from_secs(2))
        .error_retry_delay(Duration::from_secs(10))
        .event_channel_capacity(256)
        .notification_log_dir("./notifications")
        .retry_policy(50, 5)
        .build();

    let gateway = Arc::new(ReqwestGateway::with_config(&config));
    let (notifier, mut alerts) = ChannelNotifier::new(32);
    let watcher = OrderStatusWatcher::with_gateway_and_config(gateway, Arc::new(notifier), config);

    println!("Polling the emulator every 2s, notifications saved under ./notifications");
    watcher.start(user_id.as_str()).await?;

    while let Some(alert) = alerts.recv().await {
        println!("[ALERT] {}: {}", alert.title, alert.body);
    }

    watcher.stop().await;
    Ok(())
}
