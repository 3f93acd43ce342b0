#[derive(thiserror::Error, Debug)]
pub enum AttachmentError {
    #[error("invalid owner type: {0}")]
    InvalidOwner(String),
    #[error("owner id could not be resolved for {0}")]
    UnresolvedOwner(String),
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("failed to fetch remote file")]
    Fetch(#[source] anyhow::Error),
    #[error("file storage failed")]
    Storage(#[source] anyhow::Error),
    #[error("failed to persist file record")]
    Persist(#[source] anyhow::Error),
}
