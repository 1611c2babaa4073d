//! ApkHub storage library
//!
//! Storage abstraction and implementations for hosted APK files: the
//! `Storage` trait plus S3-compatible and local filesystem backends.
//!
//! # Storage key format
//!
//! All backends use the same key layout: `apks/{file_id}/{filename}`.
//! Keys must not contain `..` or a leading `/`. Key generation is
//! centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::apk_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
