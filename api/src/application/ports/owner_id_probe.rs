use async_trait::async_trait;

/// Looks up the highest id currently stored for an owner type. Only wired in
/// when unpersisted owners are allowed to borrow that id.
#[async_trait]
pub trait OwnerIdProbe: Send + Sync {
    async fn max_id(&self, object_type: &str) -> anyhow::Result<Option<i64>>;
}
