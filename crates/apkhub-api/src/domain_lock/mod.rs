//! Domain-lock download verification.
//!
//! A domain-locked file is never served straight from its public link.
//! Instead the link renders a self-contained verification page whose inline
//! script checks the browser's referrer against the file's allowed domain
//! and, on a match, redirects to the gated download endpoint carrying a
//! short-lived single-use token. The gated endpoint is the only
//! authoritative gate: it validates and consumes the token before any bytes
//! leave storage.
//!
//! The referer check runs client-side and is spoofable by construction; the
//! property this module delivers is raising the bar against casual
//! hotlinking, not cryptographic access control.

pub mod grant_store;
pub mod referrer;
pub mod resolver;
pub mod verify_page;

pub use grant_store::{Denied, DownloadGrant, GrantStore};
pub use resolver::GateDecision;
