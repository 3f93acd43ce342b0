pub mod file_record_repository_sqlx;
pub mod owner_id_probe_sqlx;
