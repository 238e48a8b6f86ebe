use crate::models::STATUS_UPDATED_TITLE;
use std::path::PathBuf;
use std::time::Duration;

pub struct WatcherConfig {
    pub base_url: String,
    pub project_id: String,
    pub database_id: String,
    pub auth_token: Option<String>,
    pub user_agent: String,
    pub retry_base_ms: u32,
    pub max_retries: u32,
    pub polling_interval: Duration,
    pub error_retry_delay: Duration,
    pub event_channel_capacity: usize,
    pub batch_channel_capacity: usize,
    pub notification_log_dir: Option<PathBuf>,
    pub notification_title: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://firestore.googleapis.com".to_string(),
            project_id: String::new(),
            database_id: "(default)".to_string(),
            auth_token: None,
            user_agent: concat!("order-status-watcher/", env!("CARGO_PKG_VERSION")).to_string(),
            retry_base_ms: 20,
            max_retries: 3,
            polling_interval: Duration::from_millis(1500),
            error_retry_delay: Duration::from_secs(5),
            event_channel_capacity: 512,
            batch_channel_capacity: 64,
            notification_log_dir: None,
            notification_title: STATUS_UPDATED_TITLE.to_string(),
        }
    }
}

impl WatcherConfig {
    pub fn builder() -> WatcherConfigBuilder {
        WatcherConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct WatcherConfigBuilder {
    config: WatcherConfig,
}

impl WatcherConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn project_id(mut self, project: impl Into<String>) -> Self {
        self.config.project_id = project.into();
        self
    }

    pub fn database_id(mut self, database: impl Into<String>) -> Self {
        self.config.database_id = database.into();
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth_token = Some(token.into());
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn retry_policy(mut self, base_ms: u32, max_retries: u32) -> Self {
        self.config.retry_base_ms = base_ms;
        self.config.max_retries = max_retries;
        self
    }

    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.config.polling_interval = interval;
        self
    }

    pub fn error_retry_delay(mut self, delay: Duration) -> Self {
        self.config.error_retry_delay = delay;
        self
    }

    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.event_channel_capacity = capacity;
        self
    }

    pub fn batch_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.batch_channel_capacity = capacity;
        self
    }

    pub fn notification_log_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.notification_log_dir = Some(path.into());
        self
    }

    pub fn notification_title(mut self, title: impl Into<String>) -> Self {
        self.config.notification_title = title.into();
        self
    }

    pub fn build(self) -> WatcherConfig {
        self.config
    }
}
