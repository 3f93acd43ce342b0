//! Attaches stored files to owner records and resolves their display URLs.
//!
//! Owners are addressed by `(object_type, object_id)`. Blobs live under
//! `<object_type>/<file_name>` in the blob storage, one FileRecord each.
//! Read paths never fail: anything that cannot be resolved degrades to the
//! default asset of the requested type.

mod error;
pub mod naming;

pub use error::AttachmentError;

use std::fmt::Write;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::application::dto::attachments::{
    IncomingFile, IncomingFiles, ResolveOptions, UploadOptions,
};
use crate::application::ports::blob_storage::BlobStorage;
use crate::application::ports::file_fetcher::{FetchTooLarge, FileFetcher};
use crate::application::ports::file_record_repository::FileRecordRepository;
use crate::application::ports::owner_id_probe::OwnerIdProbe;
use crate::application::ports::url_builder::UrlBuilder;
use crate::domain::attachments::file_record::stored_path;
use crate::domain::attachments::{FileRecord, NewFileRecord, OwnerRef};

const MAX_NAME_ATTEMPTS: usize = 1000;

#[derive(Clone)]
pub struct AttachmentResolver {
    records: Arc<dyn FileRecordRepository>,
    storage: Arc<dyn BlobStorage>,
    fetcher: Arc<dyn FileFetcher>,
    urls: Arc<dyn UrlBuilder>,
    owner_ids: Option<Arc<dyn OwnerIdProbe>>,
}

impl AttachmentResolver {
    pub fn new(
        records: Arc<dyn FileRecordRepository>,
        storage: Arc<dyn BlobStorage>,
        fetcher: Arc<dyn FileFetcher>,
        urls: Arc<dyn UrlBuilder>,
    ) -> Self {
        Self {
            records,
            storage,
            fetcher,
            urls,
            owner_ids: None,
        }
    }

    /// Lets owners without an id borrow the current max id of their table.
    /// Two owners created concurrently can end up sharing files.
    pub fn with_owner_id_probe(mut self, probe: Arc<dyn OwnerIdProbe>) -> Self {
        self.owner_ids = Some(probe);
        self
    }

    pub async fn upload_files(
        &self,
        owner: &OwnerRef,
        incoming: &IncomingFiles,
        options: &UploadOptions,
    ) -> Result<Vec<FileRecord>, AttachmentError> {
        if !incoming.has_files() {
            return Ok(Vec::new());
        }
        let (object_type, object_id) = self.owner_key(owner).await?;
        self.store_all(&object_type, object_id, incoming, options)
            .await
    }

    pub async fn upload_from_url(
        &self,
        owner: &OwnerRef,
        source_url: &str,
        options: &UploadOptions,
    ) -> Result<FileRecord, AttachmentError> {
        let (object_type, object_id) = self.owner_key(owner).await?;
        let name = naming::file_name_from_url(source_url);
        let checked_name = naming::stored_name(Some(&name));
        // Extension is known from the URL, so refuse before downloading.
        if options.allowed_extensions.is_some() {
            validate(&checked_name, 0, options)?;
        }
        let fetched = self
            .fetcher
            .fetch(source_url, options.max_bytes)
            .await
            .map_err(|err| {
                if let Some(too_large) = err.downcast_ref::<FetchTooLarge>() {
                    return AttachmentError::Rejected(format!(
                        "{name} exceeds the limit of {} bytes",
                        too_large.limit
                    ));
                }
                tracing::warn!(error = ?err, url = %source_url, "attachment_fetch_failed");
                AttachmentError::Fetch(err)
            })?;
        validate(&checked_name, fetched.bytes.len(), options)?;
        let dir = self.ensure_dir(&object_type).await?;
        self.store_one(
            &dir,
            &object_type,
            object_id,
            Some(&name),
            fetched.content_type,
            &fetched.bytes,
        )
        .await
    }

    /// Swaps the owner's attachments for the incoming files. Leaves existing
    /// records alone when nothing was uploaded.
    pub async fn replace_files(
        &self,
        owner: &OwnerRef,
        incoming: &IncomingFiles,
        options: &UploadOptions,
    ) -> Result<Vec<FileRecord>, AttachmentError> {
        if !incoming.has_files() {
            return Ok(Vec::new());
        }
        let (object_type, object_id) = self.owner_key(owner).await?;
        validate_all(incoming, options)?;
        // Not transactional: a crash after this point leaves the owner empty.
        self.delete_for(&object_type, object_id).await?;
        self.store_all(&object_type, object_id, incoming, options)
            .await
    }

    pub async fn resolve_url(&self, owner: &OwnerRef, options: &ResolveOptions) -> String {
        let asset_type = asset_type(owner, options);
        let records = self.lookup(owner).await;
        let Some(first) = records.first() else {
            return self.fallback(asset_type, options).unwrap_or_default();
        };
        match self.blob_url(first).await {
            Some(url) => url,
            None => self.fallback(asset_type, options).unwrap_or_default(),
        }
    }

    pub async fn resolve_all_urls(
        &self,
        owner: &OwnerRef,
        options: &ResolveOptions,
    ) -> Vec<String> {
        let asset_type = asset_type(owner, options);
        let records = self.lookup(owner).await;
        if records.is_empty() {
            return self.fallback(asset_type, options).into_iter().collect();
        }
        let mut urls = Vec::with_capacity(records.len());
        for record in &records {
            match self.blob_url(record).await {
                Some(url) => urls.push(url),
                None => urls.extend(self.fallback(asset_type, options)),
            }
        }
        urls
    }

    pub fn url_of(&self, record: &FileRecord) -> String {
        self.urls.public_url(&record.stored_path())
    }

    pub async fn list_files(&self, owner: &OwnerRef) -> Result<Vec<FileRecord>, AttachmentError> {
        let (object_type, object_id) = self.owner_key(owner).await?;
        self.records
            .find_by_owner(&object_type, object_id)
            .await
            .map_err(AttachmentError::Persist)
    }

    /// Returns `false` when the owner had nothing attached.
    pub async fn delete_files(&self, owner: &OwnerRef) -> Result<bool, AttachmentError> {
        let (object_type, object_id) = match self.owner_key(owner).await {
            Ok(key) => key,
            Err(AttachmentError::UnresolvedOwner(_)) => return Ok(false),
            Err(err) => return Err(err),
        };
        self.delete_for(&object_type, object_id).await
    }

    async fn owner_key(&self, owner: &OwnerRef) -> Result<(String, i64), AttachmentError> {
        let object_type = owner.object_type.as_str();
        if !naming::is_valid_object_type(object_type) {
            return Err(AttachmentError::InvalidOwner(object_type.to_string()));
        }
        if let Some(id) = owner.object_id {
            return Ok((object_type.to_string(), id));
        }
        let Some(probe) = &self.owner_ids else {
            return Err(AttachmentError::UnresolvedOwner(object_type.to_string()));
        };
        let max = probe
            .max_id(object_type)
            .await
            .map_err(AttachmentError::Persist)?;
        match max {
            Some(id) => {
                tracing::warn!(
                    object_type = %object_type,
                    object_id = id,
                    "owner_id_borrowed_from_max_id"
                );
                Ok((object_type.to_string(), id))
            }
            None => Err(AttachmentError::UnresolvedOwner(object_type.to_string())),
        }
    }

    async fn lookup(&self, owner: &OwnerRef) -> Vec<FileRecord> {
        let (object_type, object_id) = match self.owner_key(owner).await {
            Ok(key) => key,
            Err(err) => {
                tracing::debug!(error = %err, "attachment_owner_unresolved");
                return Vec::new();
            }
        };
        match self.records.find_by_owner(&object_type, object_id).await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(
                    error = ?err,
                    object_type = %object_type,
                    object_id,
                    "attachment_lookup_failed"
                );
                Vec::new()
            }
        }
    }

    async fn blob_url(&self, record: &FileRecord) -> Option<String> {
        let path = record.stored_path();
        match self.storage.exists(&path).await {
            Ok(true) => Some(self.urls.public_url(&path)),
            Ok(false) => None,
            Err(err) => {
                tracing::warn!(error = ?err, path = %path, "attachment_exists_check_failed");
                None
            }
        }
    }

    fn fallback(&self, asset_type: &str, options: &ResolveOptions) -> Option<String> {
        if !options.use_default {
            return None;
        }
        let asset = self.urls.default_asset(asset_type);
        Some(self.urls.asset_url(&asset))
    }

    async fn ensure_dir(&self, object_type: &str) -> Result<String, AttachmentError> {
        self.storage
            .ensure_directory(object_type)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, object_type = %object_type, "ensure_directory_failed");
                AttachmentError::Storage(err)
            })
    }

    async fn store_all(
        &self,
        object_type: &str,
        object_id: i64,
        incoming: &IncomingFiles,
        options: &UploadOptions,
    ) -> Result<Vec<FileRecord>, AttachmentError> {
        validate_all(incoming, options)?;
        let dir = self.ensure_dir(object_type).await?;
        let mut created = Vec::new();
        for (field, files) in incoming.file_fields() {
            for file in files {
                let record = self
                    .store_one(
                        &dir,
                        object_type,
                        object_id,
                        file.file_name.as_deref(),
                        file.content_type.clone(),
                        &file.bytes,
                    )
                    .await?;
                tracing::debug!(
                    field = %field,
                    file_id = %record.id,
                    file_name = %record.file_name,
                    "attachment_stored"
                );
                created.push(record);
            }
        }
        Ok(created)
    }

    async fn store_one(
        &self,
        dir: &str,
        object_type: &str,
        object_id: i64,
        original_name: Option<&str>,
        content_type: Option<String>,
        bytes: &[u8],
    ) -> Result<FileRecord, AttachmentError> {
        let (file_name, path) = self.write_unclaimed(dir, original_name, bytes).await?;

        let content_type = content_type.filter(|ct| !ct.is_empty()).or_else(|| {
            mime_guess::from_path(&file_name)
                .first()
                .map(|m| m.essence_str().to_string())
        });
        let record = NewFileRecord {
            object_type: object_type.to_string(),
            object_id,
            file_name,
            original_name: original_name.map(str::to_string),
            content_type,
            size: bytes.len() as i64,
            content_hash: content_hash(bytes),
        };
        match self.records.insert(&record).await {
            Ok(saved) => Ok(saved),
            Err(err) => {
                tracing::error!(error = ?err, path = %path, "file_record_insert_failed");
                if let Err(cleanup) = self.storage.delete(&path).await {
                    tracing::warn!(error = ?cleanup, path = %path, "orphan_blob_cleanup_failed");
                }
                Err(AttachmentError::Persist(err))
            }
        }
    }

    /// Writes under the first of `name`, `name-1`, `name-2`, ... that the
    /// storage can create exclusively. Returns the chosen name and path.
    async fn write_unclaimed(
        &self,
        dir: &str,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<(String, String), AttachmentError> {
        let base = naming::stored_name(original_name);
        let mut candidate = base.clone();
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let path = stored_path(dir, &candidate);
            let created = self.storage.write_new(&path, bytes).await.map_err(|err| {
                tracing::error!(error = ?err, path = %path, "blob_write_failed");
                AttachmentError::Storage(err)
            })?;
            if created {
                return Ok((candidate, path));
            }
            candidate = naming::numbered(&base, attempt);
        }
        Err(AttachmentError::Storage(anyhow::anyhow!(
            "no free name for {base} in {dir}"
        )))
    }

    async fn delete_for(&self, object_type: &str, object_id: i64) -> Result<bool, AttachmentError> {
        let records = self
            .records
            .find_by_owner(object_type, object_id)
            .await
            .map_err(AttachmentError::Persist)?;
        if records.is_empty() {
            return Ok(false);
        }
        for record in &records {
            let path = record.stored_path();
            if self
                .storage
                .exists(&path)
                .await
                .map_err(AttachmentError::Storage)?
            {
                self.storage.delete(&path).await.map_err(|err| {
                    tracing::error!(error = ?err, path = %path, "blob_delete_failed");
                    AttachmentError::Storage(err)
                })?;
            }
        }
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let removed = self
            .records
            .delete_by_ids(&ids)
            .await
            .map_err(AttachmentError::Persist)?;
        tracing::info!(
            object_type = %object_type,
            object_id,
            removed,
            "attachments_deleted"
        );
        Ok(true)
    }
}

fn asset_type<'a>(owner: &'a OwnerRef, options: &'a ResolveOptions) -> &'a str {
    options
        .asset_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(&owner.object_type)
}

fn validate_all(incoming: &IncomingFiles, options: &UploadOptions) -> Result<(), AttachmentError> {
    for (_, files) in incoming.file_fields() {
        for IncomingFile {
            file_name, bytes, ..
        } in files
        {
            validate(
                &naming::stored_name(file_name.as_deref()),
                bytes.len(),
                options,
            )?;
        }
    }
    Ok(())
}

fn validate(name: &str, size: usize, options: &UploadOptions) -> Result<(), AttachmentError> {
    if let Some(max) = options.max_bytes {
        if size > max {
            return Err(AttachmentError::Rejected(format!(
                "{name} is {size} bytes, limit is {max}"
            )));
        }
    }
    if let Some(allowed) = &options.allowed_extensions {
        let ext = naming::extension_of(name).unwrap_or_default();
        if !allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) {
            return Err(AttachmentError::Rejected(format!(
                "extension of {name} is not allowed"
            )));
        }
    }
    Ok(())
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        let _ = write!(&mut out, "{:02x}", byte);
    }
    out
}
