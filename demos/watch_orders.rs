use order_status_watcher::{Event, OrderStatusWatcher, WatcherConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let project_id = std::env::var("FIRESTORE_PROJECT_ID")
        .expect("FIRESTORE_PROJECT_ID environment variable required");
    let user_id =
        std::env::var("WATCH_USER_ID").expect("WATCH_USER_ID environment variable required");

    let mut config = WatcherConfig::builder().project_id(project_id);
    if let Ok(token) = std::env::var("FIRESTORE_ID_TOKEN") {
        config = config.auth_token(token);
    }

    let watcher = OrderStatusWatcher::from_config(config.build());
    let mut rx = watcher.subscribe();

    watcher.start(user_id.as_str()).await?;
    println!("Watching orders of {user_id}, press Ctrl-C to stop");

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(Event::OrderStatusChanged { notification, .. }) => {
                    println!(
                        "[ORDER] {}: {} -> {}",
                        notification.order_id, notification.previous_status, notification.new_status
                    );
                }
                Ok(Event::FeedFailed { message, .. }) => {
                    println!("[FEED] {message}");
                }
                Ok(_) => {}
                Err(_) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    watcher.stop().await;
    Ok(())
}
