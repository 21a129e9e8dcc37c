pub mod container_file;
pub mod library;
pub mod metadata;
