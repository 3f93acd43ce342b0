pub mod file_record;
pub mod owner;

pub use file_record::{FileRecord, NewFileRecord};
pub use owner::{AttachmentOwner, OwnerRef};
