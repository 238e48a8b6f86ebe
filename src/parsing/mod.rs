mod documents;
pub mod values;

pub use documents::{
    parse_commit_time, parse_notification_document, parse_notifications, parse_order_document,
    parse_orders, query_documents,
};
