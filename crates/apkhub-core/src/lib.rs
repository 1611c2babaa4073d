//! ApkHub core library
//!
//! Shared foundation for the ApkHub workspace: configuration, the unified
//! `AppError` type with its HTTP metadata, and the domain models.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
