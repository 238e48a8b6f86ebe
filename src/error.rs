use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("user id must not be empty")]
    EmptyUserId,
    #[error("unauthorized")]
    Unauthorized,
    #[error("request failed: {status}")]
    RequestFailed {
        status: StatusCode,
        body: String,
        url: String,
    },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("change feed closed")]
    FeedClosed,
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("middleware: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_retryable(err: &WatcherError) -> bool {
        match err {
            WatcherError::Http(_) | WatcherError::Middleware(_) => true,
            WatcherError::RequestFailed { status, .. } => status.is_server_error(),
            WatcherError::EmptyUserId
            | WatcherError::Unauthorized
            | WatcherError::Parse(_)
            | WatcherError::FeedClosed => false,
        }
    }

    #[test]
    fn every_variant_is_reachable_from_gateway_or_feed() {
        let failed = WatcherError::RequestFailed {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
            url: "https://firestore.googleapis.com/v1/x".to_string(),
        };
        assert!(is_retryable(&failed));
        assert_eq!(failed.to_string(), "request failed: 503 Service Unavailable");
        assert!(!is_retryable(&WatcherError::FeedClosed));
        assert_eq!(
            WatcherError::Parse("bad name".to_string()).to_string(),
            "parse error: bad name"
        );
    }
}
