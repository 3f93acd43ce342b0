use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};

use crate::application::ports::file_fetcher::{FetchTooLarge, FetchedFile, FileFetcher};

pub struct ReqwestFileFetcher {
    client: reqwest::Client,
}

impl ReqwestFileFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FileFetcher for ReqwestFileFetcher {
    async fn fetch(&self, url: &str, max_bytes: Option<usize>) -> anyhow::Result<FetchedFile> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("request failed: {e}"))?;
        if !resp.status().is_success() {
            anyhow::bail!("upstream returned status {}", resp.status());
        }
        if let (Some(limit), Some(declared)) = (max_bytes, resp.content_length()) {
            if declared > limit as u64 {
                return Err(FetchTooLarge { limit }.into());
            }
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != "application/octet-stream");
        let bytes = read_capped(Box::pin(resp.bytes_stream()), max_bytes).await?;
        Ok(FetchedFile {
            bytes,
            content_type,
        })
    }
}

/// Collects `body`, stopping as soon as it grows past `max_bytes`.
async fn read_capped<S, B, E>(mut body: S, max_bytes: Option<usize>) -> anyhow::Result<Vec<u8>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| anyhow::anyhow!("failed to read body: {e}"))?;
        out.extend_from_slice(chunk.as_ref());
        if let Some(limit) = max_bytes {
            if out.len() > limit {
                return Err(FetchTooLarge { limit }.into());
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunks(parts: &[&[u8]]) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Unpin {
        stream::iter(parts.iter().map(|p| Ok(p.to_vec())).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn collects_body_within_limit() {
        let body = read_capped(chunks(&[b"abc", b"def"]), Some(6)).await.unwrap();
        assert_eq!(body, b"abcdef");
    }

    #[tokio::test]
    async fn stops_once_body_passes_limit() {
        let err = read_capped(chunks(&[b"abcd", b"efgh", b"ijkl"]), Some(6))
            .await
            .unwrap_err();
        let too_large = err.downcast_ref::<FetchTooLarge>().unwrap();
        assert_eq!(too_large.limit, 6);
    }

    #[tokio::test]
    async fn unlimited_without_a_cap() {
        let body = read_capped(chunks(&[&[0u8; 512], &[1u8; 512]]), None)
            .await
            .unwrap();
        assert_eq!(body.len(), 1024);
    }

    #[tokio::test]
    async fn stream_errors_are_reported() {
        let failing = stream::iter(vec![
            Ok(b"ab".to_vec()),
            Err(std::io::Error::other("connection reset")),
        ]);
        let err = read_capped(failing, None).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }
}
