mod core;
mod fs_blob_storage;
mod s3_blob_storage;
pub use self::core::*;
pub mod fs {
    pub use super::fs_blob_storage::*;
}
pub mod s3 {
    pub use super::s3_blob_storage::*;
}
