use crate::client::urls::UrlBuilder;
use crate::client::DocumentStoreGateway;
use crate::config::WatcherConfig;
use crate::error::WatcherError;
use crate::models::ids::{NotificationId, UserId};
use crate::models::{NotificationDraft, OrderDocument, PersistedNotification};
use crate::parsing::values::{bool_value, string_value};
use crate::parsing::{parse_commit_time, parse_notifications, parse_orders};
use crate::utils::is_valid_document_id;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde_json::{json, Value};

pub const ORDERS_COLLECTION: &str = "orders";
pub const NOTIFICATIONS_COLLECTION: &str = "notifications";

pub struct ReqwestGateway {
    pub client: ClientWithMiddleware,
    pub urls: UrlBuilder,
    auth_token: Option<String>,
    user_agent: String,
}

impl ReqwestGateway {
    pub fn new() -> Self {
        Self::with_config(&WatcherConfig::default())
    }

    pub fn with_config(config: &WatcherConfig) -> Self {
        let retry_policy = ExponentialBackoff::builder()
            .base(config.retry_base_ms)
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self {
            client,
            urls: UrlBuilder::new(&config.base_url, &config.project_id, &config.database_id),
            auth_token: config.auth_token.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    fn add_common_headers(
        &self,
        builder: reqwest_middleware::RequestBuilder,
    ) -> reqwest_middleware::RequestBuilder {
        let builder = builder
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::ACCEPT, "application/json");
        match self.auth_token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(
        &self,
        builder: reqwest_middleware::RequestBuilder,
    ) -> Result<reqwest::Response, WatcherError> {
        let resp = self.add_common_headers(builder).send().await?;
        if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::FORBIDDEN {
            return Err(WatcherError::Unauthorized);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let url = resp.url().to_string();
            let body = resp.text().await.unwrap_or_default();
            return Err(WatcherError::RequestFailed { status, body, url });
        }
        Ok(resp)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, WatcherError> {
        let req = self.client.post(url).json(body);
        let resp = self.execute(req).await?;
        let v: Value = resp.json().await?;
        Ok(v)
    }
}

impl Default for ReqwestGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_user_id(user_id: &UserId) -> Result<(), WatcherError> {
    if user_id.trim().is_empty() {
        return Err(WatcherError::EmptyUserId);
    }
    ensure_document_id(user_id)
}

fn ensure_document_id(id: &str) -> Result<(), WatcherError> {
    if !is_valid_document_id(id) {
        return Err(WatcherError::Parse(format!("invalid document id: {id}")));
    }
    Ok(())
}

/// `orders where userId == {user_id}`
pub fn orders_query(user_id: &str) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": ORDERS_COLLECTION }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": "userId" },
                    "op": "EQUAL",
                    "value": string_value(user_id)
                }
            }
        }
    })
}

/// The user's notifications, newest first.
pub fn notifications_query() -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": NOTIFICATIONS_COLLECTION }],
            "orderBy": [{
                "field": { "fieldPath": "createdAt" },
                "direction": "DESCENDING"
            }]
        }
    })
}

/// A create-only write whose `createdAt` is stamped by the server.
pub fn notification_commit(document_name: &str, draft: &NotificationDraft) -> Value {
    json!({
        "writes": [{
            "update": {
                "name": document_name,
                "fields": {
                    "title": string_value(&draft.title),
                    "body": string_value(&draft.body),
                    "orderId": string_value(&draft.order_id),
                    "status": string_value(&draft.status),
                    "read": bool_value(false)
                }
            },
            "updateTransforms": [{
                "fieldPath": "createdAt",
                "setToServerValue": "REQUEST_TIME"
            }],
            "currentDocument": { "exists": false }
        }]
    })
}

#[async_trait]
impl DocumentStoreGateway for ReqwestGateway {
    async fn list_user_orders(&self, user_id: &UserId) -> Result<Vec<OrderDocument>, WatcherError> {
        ensure_user_id(user_id)?;
        let url = self.urls.run_query();
        let response = self.post_json(&url, &orders_query(user_id)).await?;
        parse_orders(&response)
    }

    async fn create_notification(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
        draft: &NotificationDraft,
    ) -> Result<PersistedNotification, WatcherError> {
        ensure_user_id(user_id)?;
        ensure_document_id(notification_id)?;
        let path = UrlBuilder::notification_path(user_id, notification_id);
        let name = self.urls.document_name(&path);
        let url = self.urls.commit();
        let response = self.post_json(&url, &notification_commit(&name, draft)).await?;
        let created_at = parse_commit_time(&response).unwrap_or_else(Utc::now);
        Ok(PersistedNotification::from_draft(
            notification_id.clone(),
            draft.clone(),
            created_at,
        ))
    }

    async fn list_notifications(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<PersistedNotification>, WatcherError> {
        ensure_user_id(user_id)?;
        let url = self.urls.run_query_under(&UrlBuilder::user_path(user_id));
        let response = self.post_json(&url, &notifications_query()).await?;
        parse_notifications(&response)
    }

    async fn mark_notification_read(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), WatcherError> {
        ensure_user_id(user_id)?;
        ensure_document_id(notification_id)?;
        let path = UrlBuilder::notification_path(user_id, notification_id);
        let url = self.urls.document(&path);
        let body = json!({ "fields": { "read": bool_value(true) } });
        let req = self
            .client
            .patch(&url)
            .query(&[
                ("updateMask.fieldPaths", "read"),
                ("currentDocument.exists", "true"),
            ])
            .json(&body);
        self.execute(req).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ids::OrderId;

    #[test]
    fn orders_query_filters_by_owner() {
        let body = orders_query("u1");
        let filter = &body["structuredQuery"]["where"]["fieldFilter"];

        assert_eq!(body["structuredQuery"]["from"][0]["collectionId"], "orders");
        assert_eq!(filter["field"]["fieldPath"], "userId");
        assert_eq!(filter["op"], "EQUAL");
        assert_eq!(filter["value"]["stringValue"], "u1");
    }

    #[test]
    fn notification_commit_is_create_only_with_server_timestamp() {
        let draft = NotificationDraft {
            title: "Order status updated".to_string(),
            body: "Your order is now shipped.".to_string(),
            order_id: OrderId::from("o1"),
            status: "shipped".to_string(),
        };
        let body = notification_commit("projects/p/databases/(default)/documents/users/u1/notifications/n1", &draft);
        let write = &body["writes"][0];

        assert_eq!(write["currentDocument"]["exists"], false);
        assert_eq!(write["updateTransforms"][0]["fieldPath"], "createdAt");
        assert_eq!(write["updateTransforms"][0]["setToServerValue"], "REQUEST_TIME");
        assert_eq!(write["update"]["fields"]["orderId"]["stringValue"], "o1");
        assert_eq!(write["update"]["fields"]["read"]["booleanValue"], false);
        assert!(write["update"]["fields"].get("createdAt").is_none());
    }

    #[test]
    fn rejects_unusable_ids() {
        assert!(matches!(
            ensure_user_id(&UserId::from("  ")),
            Err(WatcherError::EmptyUserId)
        ));
        assert!(matches!(ensure_document_id(""), Err(WatcherError::Parse(_))));
        assert!(matches!(ensure_document_id("a/b"), Err(WatcherError::Parse(_))));
        assert!(ensure_document_id("u1").is_ok());
    }
}
