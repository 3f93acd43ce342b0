use anyhow::Context;
use async_trait::async_trait;

use crate::application::ports::owner_id_probe::OwnerIdProbe;
use crate::application::services::attachments::naming::is_valid_object_type;
use crate::infrastructure::db::PgPool;

/// Reads `MAX(id)` from the table named by the object type.
pub struct SqlxOwnerIdProbe {
    pub pool: PgPool,
}

impl SqlxOwnerIdProbe {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OwnerIdProbe for SqlxOwnerIdProbe {
    async fn max_id(&self, object_type: &str) -> anyhow::Result<Option<i64>> {
        // Identifiers cannot be bound; only plain names reach the query.
        if !is_valid_object_type(object_type) {
            anyhow::bail!("invalid table name: {object_type}");
        }
        let sql = format!(r#"SELECT MAX(id)::BIGINT FROM "{}""#, object_type);
        let max = sqlx::query_scalar::<_, Option<i64>>(&sql)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("max id lookup on {object_type}"))?;
        Ok(max)
    }
}
