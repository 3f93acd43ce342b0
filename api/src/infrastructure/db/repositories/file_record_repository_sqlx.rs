use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::ports::file_record_repository::FileRecordRepository;
use crate::domain::attachments::{FileRecord, NewFileRecord};
use crate::infrastructure::db::PgPool;

pub struct SqlxFileRecordRepository {
    pub pool: PgPool,
}

impl SqlxFileRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_row(r: PgRow) -> FileRecord {
    FileRecord {
        id: r.get("id"),
        object_type: r.get("object_type"),
        object_id: r.get("object_id"),
        file_name: r.get("file_name"),
        original_name: r.try_get("original_name").ok(),
        content_type: r.try_get("content_type").ok(),
        size: r.get("size"),
        content_hash: r.get("content_hash"),
        created_at: r.get("created_at"),
    }
}

#[async_trait]
impl FileRecordRepository for SqlxFileRecordRepository {
    async fn insert(&self, record: &NewFileRecord) -> anyhow::Result<FileRecord> {
        let row = sqlx::query(
            r#"INSERT INTO files (object_type, object_id, file_name, original_name, content_type, size, content_hash)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, object_type, object_id, file_name, original_name, content_type, size, content_hash, created_at"#,
        )
        .bind(&record.object_type)
        .bind(record.object_id)
        .bind(&record.file_name)
        .bind(record.original_name.as_deref())
        .bind(record.content_type.as_deref())
        .bind(record.size)
        .bind(&record.content_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(map_row(row))
    }

    async fn find_by_owner(
        &self,
        object_type: &str,
        object_id: i64,
    ) -> anyhow::Result<Vec<FileRecord>> {
        let rows = sqlx::query(
            r#"SELECT id, object_type, object_id, file_name, original_name, content_type, size, content_hash, created_at
               FROM files
               WHERE object_type = $1 AND object_id = $2
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(object_type)
        .bind(object_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(map_row).collect())
    }

    async fn delete_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let res = sqlx::query("DELETE FROM files WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}
