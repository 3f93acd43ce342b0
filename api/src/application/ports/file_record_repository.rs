use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::attachments::{FileRecord, NewFileRecord};

#[async_trait]
pub trait FileRecordRepository: Send + Sync {
    async fn insert(&self, record: &NewFileRecord) -> anyhow::Result<FileRecord>;
    // Oldest first; the first element is what single-url lookups use.
    async fn find_by_owner(
        &self,
        object_type: &str,
        object_id: i64,
    ) -> anyhow::Result<Vec<FileRecord>>;
    async fn delete_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<u64>;
}
