use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::application::ports::blob_storage::BlobStorage;
use crate::infrastructure::storage::{absolute_under, normalize_relative};

pub struct FsBlobStorage {
    pub uploads_root: PathBuf,
}

impl FsBlobStorage {
    pub fn new(uploads_root: impl Into<PathBuf>) -> Self {
        Self {
            uploads_root: uploads_root.into(),
        }
    }
}

#[async_trait]
impl BlobStorage for FsBlobStorage {
    async fn ensure_directory(&self, dir: &str) -> anyhow::Result<String> {
        let rel = normalize_relative(dir)?;
        let full = self.uploads_root.join(&rel);
        fs::create_dir_all(&full)
            .await
            .with_context(|| format!("create directory {}", full.display()))?;
        Ok(rel)
    }

    async fn write_new(&self, path: &str, bytes: &[u8]) -> anyhow::Result<bool> {
        let full = absolute_under(&self.uploads_root, path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e).with_context(|| format!("create {}", full.display())),
        };
        let written = async {
            file.write_all(bytes).await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            drop(file);
            let _ = fs::remove_file(&full).await;
            return Err(e).with_context(|| format!("write {}", full.display()));
        }
        Ok(true)
    }

    async fn exists(&self, path: &str) -> anyhow::Result<bool> {
        let full = absolute_under(&self.uploads_root, path)?;
        Ok(fs::try_exists(&full).await.unwrap_or(false))
    }

    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        let full = absolute_under(&self.uploads_root, path)?;
        match fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", full.display())),
        }
    }

    async fn read(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let full = absolute_under(&self.uploads_root, path)?;
        let data = fs::read(&full).await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_checks_and_deletes_under_root() {
        let temp = TempDir::new().unwrap();
        let storage = FsBlobStorage::new(temp.path().join("uploads"));

        let dir = storage.ensure_directory("users").await.unwrap();
        assert_eq!(dir, "users");
        assert!(temp.path().join("uploads/users").is_dir());

        assert!(storage.write_new("users/a.png", b"png").await.unwrap());
        assert!(storage.exists("users/a.png").await.unwrap());
        assert_eq!(storage.read("users/a.png").await.unwrap(), b"png");

        storage.delete("users/a.png").await.unwrap();
        assert!(!storage.exists("users/a.png").await.unwrap());
        // deleting twice is fine
        storage.delete("users/a.png").await.unwrap();
    }

    #[tokio::test]
    async fn write_new_never_replaces_an_existing_blob() {
        let temp = TempDir::new().unwrap();
        let storage = FsBlobStorage::new(temp.path().join("uploads"));

        assert!(storage.write_new("users/a.png", b"first").await.unwrap());
        assert!(!storage.write_new("users/a.png", b"second").await.unwrap());
        assert_eq!(storage.read("users/a.png").await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn refuses_paths_outside_root() {
        let temp = TempDir::new().unwrap();
        let storage = FsBlobStorage::new(temp.path().join("uploads"));

        assert!(storage.write_new("../escape.txt", b"x").await.is_err());
        assert!(storage.exists("../../etc/passwd").await.is_err());
        assert!(storage.ensure_directory("..").await.is_err());
        assert!(!temp.path().join("escape.txt").exists());
    }
}
