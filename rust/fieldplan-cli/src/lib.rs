//! Portal-file ingest and CLI-local configuration, split out from `main`
//! so integration tests can exercise them directly.

pub mod config;
pub mod errors;
pub mod portal_file;
