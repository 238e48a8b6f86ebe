use once_cell::sync::Lazy;
use regex::Regex;

pub const AUTO_ID_LEN: usize = 20;

/// `projects/{p}/databases/{d}/documents/{collection}/{id}[/{collection}/{id}...]`;
/// the capture is the trailing document id.
pub static RE_DOCUMENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^projects/[^/]+/databases/[^/]+/documents/(?:[^/]+/[^/]+/)*[^/]+/([^/]+)$")
        .unwrap()
});

pub fn document_id_from_name(name: &str) -> Option<&str> {
    RE_DOCUMENT_NAME
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Client-generated document id in the store's own alphabet and length.
pub fn auto_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let alphabet: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    (0..AUTO_ID_LEN)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Document ids may not be empty, contain a slash, or be `.`/`..`.
pub fn is_valid_document_id(id: &str) -> bool {
    !id.trim().is_empty() && !id.contains('/') && id != "." && id != ".."
}
