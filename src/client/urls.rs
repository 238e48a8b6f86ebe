pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";
pub const DEFAULT_DATABASE: &str = "(default)";

pub struct UrlBuilder {
    base_url: String,
    project_id: String,
    database_id: String,
}

impl Default for UrlBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id: String::new(),
            database_id: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl UrlBuilder {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        database_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            database_id: database_id.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resource name of the database root, as used inside request bodies.
    pub fn database_name(&self) -> String {
        format!(
            "projects/{}/databases/{}",
            self.project_id, self.database_id
        )
    }

    /// Resource name of a document below the database root.
    pub fn document_name(&self, path: &str) -> String {
        format!("{}/documents/{path}", self.database_name())
    }

    pub fn documents_root(&self) -> String {
        format!("{}/v1/{}/documents", self.base_url, self.database_name())
    }

    pub fn run_query(&self) -> String {
        format!("{}:runQuery", self.documents_root())
    }

    pub fn run_query_under(&self, parent_path: &str) -> String {
        format!("{}/{}:runQuery", self.documents_root(), encode_path(parent_path))
    }

    pub fn commit(&self) -> String {
        format!("{}:commit", self.documents_root())
    }

    pub fn document(&self, path: &str) -> String {
        format!("{}/{}", self.documents_root(), encode_path(path))
    }

    pub fn user_path(user_id: &str) -> String {
        format!("users/{user_id}")
    }

    pub fn notification_path(user_id: &str, notification_id: &str) -> String {
        format!("users/{user_id}/notifications/{notification_id}")
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
