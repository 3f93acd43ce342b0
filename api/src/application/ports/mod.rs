pub mod blob_storage;
pub mod file_fetcher;
pub mod file_record_repository;
pub mod owner_id_probe;
pub mod url_builder;
