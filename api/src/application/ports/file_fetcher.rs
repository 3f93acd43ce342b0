use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// The remote body was larger than the limit handed to the fetcher.
#[derive(Debug, thiserror::Error)]
#[error("remote file exceeds {limit} bytes")]
pub struct FetchTooLarge {
    pub limit: usize,
}

#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Downloads `url`, giving up with [`FetchTooLarge`] once the body
    /// passes `max_bytes`.
    async fn fetch(&self, url: &str, max_bytes: Option<usize>) -> anyhow::Result<FetchedFile>;
}
