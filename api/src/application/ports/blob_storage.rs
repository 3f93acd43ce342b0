use async_trait::async_trait;

/// Byte storage keyed by `/`-separated paths relative to the storage root.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Makes sure `dir` can receive writes and returns its normalised form.
    async fn ensure_directory(&self, dir: &str) -> anyhow::Result<String>;
    /// Creates `path` only if nothing is stored there yet. Returns `false`
    /// and leaves the existing blob untouched when the path is taken.
    async fn write_new(&self, path: &str, bytes: &[u8]) -> anyhow::Result<bool>;
    async fn exists(&self, path: &str) -> anyhow::Result<bool>;
    async fn delete(&self, path: &str) -> anyhow::Result<()>;
    async fn read(&self, path: &str) -> anyhow::Result<Vec<u8>>;
}
