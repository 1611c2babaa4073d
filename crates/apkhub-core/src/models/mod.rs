//! Domain models

mod apk;

pub use apk::{normalize_domain, ApkFile, ApkStatus};
