use crate::error::WatcherError;
use crate::models::ids::{NotificationId, OrderId, UserId};
use crate::models::{normalize_status, OrderDocument, PersistedNotification};
use crate::parsing::values::{bool_field, parse_timestamp, string_field, timestamp_field};
use crate::utils::document_id_from_name;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde_json::Value;

/// Pulls the `document` objects out of a `runQuery` response. Entries that only
/// carry a `readTime` (empty result sets) are skipped.
pub fn query_documents(response: &Value) -> Result<Vec<&Value>, WatcherError> {
    let entries = response
        .as_array()
        .ok_or_else(|| WatcherError::Parse(String::from("runQuery response is not an array")))?;
    Ok(entries.iter().filter_map(|e| e.get("document")).collect())
}

fn document_id(document: &Value) -> Result<&str, WatcherError> {
    let name = document
        .get("name")
        .and_then(|x| x.as_str())
        .ok_or_else(|| WatcherError::Parse(String::from("document without name")))?;
    document_id_from_name(name)
        .ok_or_else(|| WatcherError::Parse(format!("malformed document name: {name}")))
}

static EMPTY_FIELDS: Lazy<Value> = Lazy::new(|| Value::Object(Default::default()));

fn fields_of(document: &Value) -> &Value {
    document.get("fields").unwrap_or(&*EMPTY_FIELDS)
}

pub fn parse_order_document(document: &Value) -> Result<OrderDocument, WatcherError> {
    let id = document_id(document)?;
    let fields = fields_of(document);
    Ok(OrderDocument {
        id: OrderId::from(id),
        user_id: string_field(fields, "userId").map(UserId::from),
        status: normalize_status(string_field(fields, "status")),
    })
}

pub fn parse_orders(response: &Value) -> Result<Vec<OrderDocument>, WatcherError> {
    query_documents(response)?
        .into_iter()
        .map(parse_order_document)
        .collect()
}

pub fn parse_notification_document(document: &Value) -> Result<PersistedNotification, WatcherError> {
    let id = document_id(document)?;
    let fields = fields_of(document);
    let created_at = timestamp_field(fields, "createdAt").or_else(|| {
        document
            .get("createTime")
            .and_then(|x| x.as_str())
            .and_then(parse_timestamp)
    });
    Ok(PersistedNotification {
        id: NotificationId::from(id),
        title: string_field(fields, "title").unwrap_or_default().to_string(),
        body: string_field(fields, "body").unwrap_or_default().to_string(),
        order_id: OrderId::from(string_field(fields, "orderId").unwrap_or_default()),
        status: string_field(fields, "status").unwrap_or_default().to_string(),
        read: bool_field(fields, "read").unwrap_or(false),
        created_at,
    })
}

pub fn parse_notifications(response: &Value) -> Result<Vec<PersistedNotification>, WatcherError> {
    query_documents(response)?
        .into_iter()
        .map(parse_notification_document)
        .collect()
}

/// Server-assigned time of a commit: the first transform result if the write
/// carried a `REQUEST_TIME` transform, otherwise the commit time.
pub fn parse_commit_time(response: &Value) -> Option<DateTime<Utc>> {
    let from_transform = response
        .get("writeResults")
        .and_then(|x| x.as_array())
        .and_then(|results| results.first())
        .and_then(|r| r.get("transformResults"))
        .and_then(|x| x.as_array())
        .and_then(|t| t.first())
        .and_then(|t| t.get("timestampValue"))
        .and_then(|x| x.as_str())
        .and_then(parse_timestamp);
    from_transform.or_else(|| {
        response
            .get("commitTime")
            .and_then(|x| x.as_str())
            .and_then(parse_timestamp)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_order_query_response() {
        let response = json!([
            {
                "document": {
                    "name": "projects/shop/databases/(default)/documents/orders/o1",
                    "fields": {
                        "userId": {"stringValue": "u1"},
                        "status": {"stringValue": "pending"},
                        "total": {"doubleValue": 19.5}
                    }
                },
                "readTime": "2024-05-01T10:00:00Z"
            },
            {
                "document": {
                    "name": "projects/shop/databases/(default)/documents/orders/o2",
                    "fields": {"userId": {"stringValue": "u1"}}
                },
                "readTime": "2024-05-01T10:00:00Z"
            }
        ]);

        let orders = parse_orders(&response).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id.as_ref(), "o1");
        assert_eq!(orders[0].user_id.as_deref(), Some("u1"));
        assert_eq!(orders[0].status.as_deref(), Some("pending"));
        assert_eq!(orders[1].status, None);
    }

    #[test]
    fn order_status_is_not_trimmed() {
        let response = json!([
            {
                "document": {
                    "name": "projects/shop/databases/(default)/documents/orders/o1",
                    "fields": {"status": {"stringValue": " shipped "}}
                }
            },
            {
                "document": {
                    "name": "projects/shop/databases/(default)/documents/orders/o2",
                    "fields": {"status": {"stringValue": ""}}
                }
            }
        ]);

        let orders = parse_orders(&response).unwrap();
        assert_eq!(orders[0].status.as_deref(), Some(" shipped "));
        assert_eq!(orders[1].status, None);
    }

    #[test]
    fn empty_result_set_yields_no_orders() {
        let response = json!([{ "readTime": "2024-05-01T10:00:00Z" }]);
        assert!(parse_orders(&response).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_array_and_bad_names() {
        assert!(matches!(
            parse_orders(&json!({"error": "nope"})),
            Err(WatcherError::Parse(_))
        ));
        let response = json!([{ "document": { "name": "orders/o1" } }]);
        assert!(matches!(parse_orders(&response), Err(WatcherError::Parse(_))));
    }

    #[test]
    fn parses_notification_documents() {
        let response = json!([{
            "document": {
                "name": "projects/shop/databases/(default)/documents/users/u1/notifications/n1",
                "fields": {
                    "title": {"stringValue": "Order status updated"},
                    "body": {"stringValue": "Your order is now shipped."},
                    "orderId": {"stringValue": "o1"},
                    "status": {"stringValue": "shipped"},
                    "read": {"booleanValue": false},
                    "createdAt": {"timestampValue": "2024-05-01T10:00:00Z"}
                }
            }
        }]);

        let notifications = parse_notifications(&response).unwrap();
        assert_eq!(notifications.len(), 1);
        let n = &notifications[0];
        assert_eq!(n.id.as_ref(), "n1");
        assert_eq!(n.order_id.as_ref(), "o1");
        assert_eq!(n.status, "shipped");
        assert!(!n.read);
        assert!(n.created_at.is_some());
    }

    #[test]
    fn commit_time_prefers_transform_result() {
        let response = json!({
            "writeResults": [{
                "updateTime": "2024-05-01T10:00:01Z",
                "transformResults": [{"timestampValue": "2024-05-01T10:00:00Z"}]
            }],
            "commitTime": "2024-05-01T10:00:02Z"
        });
        assert_eq!(
            parse_commit_time(&response).map(|t| t.timestamp()),
            Some(1714557600)
        );

        let response = json!({ "commitTime": "2024-05-01T10:00:02Z" });
        assert_eq!(
            parse_commit_time(&response).map(|t| t.timestamp()),
            Some(1714557602)
        );
    }
}
