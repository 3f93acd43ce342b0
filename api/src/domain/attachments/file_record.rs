use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: Uuid,
    pub object_type: String,
    pub object_id: i64,
    pub file_name: String,
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub size: i64,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Path of the backing blob relative to the storage root.
    pub fn stored_path(&self) -> String {
        stored_path(&self.object_type, &self.file_name)
    }
}

#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub object_type: String,
    pub object_id: i64,
    pub file_name: String,
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub size: i64,
    pub content_hash: String,
}

pub fn stored_path(object_type: &str, file_name: &str) -> String {
    format!("{}/{}", object_type.trim_matches('/'), file_name)
}
