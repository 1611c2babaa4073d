//! In-memory store of pending download grants.
//!
//! Token = base64url(HMAC-SHA256(secret, file_id || issuance_nanos || nonce)),
//! fixed-length and URL-safe. The store is not persisted: a restart
//! invalidates all pending grants, which is acceptable since grants live
//! only seconds.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A single-use, time-limited authorization binding a token to a file.
#[derive(Debug, Clone)]
pub struct DownloadGrant {
    pub token: String,
    pub file_id: Uuid,
    /// Domain the grant was issued under, frozen at issuance. A lock change
    /// on the file mid-flight does not retroactively alter the grant.
    pub allowed_domain: String,
    pub expires_at: DateTime<Utc>,
}

/// The single failure outcome of [`GrantStore::consume`].
///
/// Absent, expired, and mismatched-file tokens are deliberately
/// indistinguishable to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denied;

/// Process-wide store of pending download grants, shared by all concurrent
/// requests. Insert and delete only; stored grants are never mutated in
/// place, so a single lock around the map is the whole discipline.
pub struct GrantStore {
    secret: Vec<u8>,
    ttl: Duration,
    grants: Mutex<HashMap<String, DownloadGrant>>,
}

impl GrantStore {
    /// # Arguments
    /// * `secret` - key for token derivation (the configured LINK_SECRET)
    /// * `ttl` - grant lifetime; long enough for a page redirect, short
    ///   enough to prevent reuse or sharing
    pub fn new(secret: impl Into<Vec<u8>>, ttl: std::time::Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(60)),
            grants: Mutex::new(HashMap::new()),
        }
    }

    /// Mint a fresh grant for the given file and lock domain.
    ///
    /// Expired entries are swept opportunistically on each issue, so the map
    /// stays bounded without a background task.
    pub async fn issue(&self, file_id: Uuid, allowed_domain: &str) -> DownloadGrant {
        let now = Utc::now();
        let mut grants = self.grants.lock().await;

        sweep_expired(&mut grants, now);

        let mut token = self.mint_token(file_id, now);
        // The random nonce makes collisions negligible; the loop keeps the
        // no-collision-with-live-entries guarantee absolute anyway.
        while grants.contains_key(&token) {
            token = self.mint_token(file_id, now);
        }

        let grant = DownloadGrant {
            token: token.clone(),
            file_id,
            allowed_domain: allowed_domain.to_string(),
            expires_at: now + self.ttl,
        };
        grants.insert(token, grant.clone());

        tracing::debug!(
            file_id = %file_id,
            allowed_domain = %allowed_domain,
            expires_at = %grant.expires_at,
            pending = grants.len(),
            "Issued download grant"
        );

        grant
    }

    /// Validate and consume a token for the given file.
    ///
    /// Lookup, validation, and removal happen under one lock acquisition, so
    /// at most one concurrent caller can observe `Ok` for a given token.
    pub async fn consume(&self, token: &str, file_id: Uuid) -> Result<(), Denied> {
        let now = Utc::now();
        let mut grants = self.grants.lock().await;

        let grant = grants.get(token).ok_or(Denied)?;

        if grant.expires_at < now {
            // Expired entries are evicted on sight.
            grants.remove(token);
            return Err(Denied);
        }
        if grant.file_id != file_id {
            return Err(Denied);
        }

        grants.remove(token);
        tracing::debug!(file_id = %file_id, "Consumed download grant");
        Ok(())
    }

    /// Remove all expired grants. Never required for correctness, only for
    /// memory hygiene.
    pub async fn sweep(&self) {
        let now = Utc::now();
        let mut grants = self.grants.lock().await;
        sweep_expired(&mut grants, now);
    }

    /// Number of pending grants (expired but unswept entries included).
    pub async fn pending(&self) -> usize {
        self.grants.lock().await.len()
    }

    fn mint_token(&self, file_id: Uuid, issued_at: DateTime<Utc>) -> String {
        let mut nonce = [0u8; 16];
        rand::rng().fill_bytes(&mut nonce);

        let mut mac =
            Hmac::<Sha256>::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(file_id.as_bytes());
        mac.update(&issued_at.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
        mac.update(&nonce);
        let tag = mac.finalize().into_bytes();

        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(tag)
    }
}

fn sweep_expired(grants: &mut HashMap<String, DownloadGrant>, now: DateTime<Utc>) {
    grants.retain(|_, grant| grant.expires_at >= now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    fn store_with_ttl(ttl: StdDuration) -> GrantStore {
        GrantStore::new(b"test-secret-test-secret-test-secret!".to_vec(), ttl)
    }

    #[tokio::test]
    async fn test_issue_and_consume() {
        let store = store_with_ttl(StdDuration::from_secs(60));
        let file_id = Uuid::new_v4();

        let grant = store.issue(file_id, "example.com").await;
        assert!(!grant.token.is_empty());
        assert_eq!(grant.file_id, file_id);
        assert_eq!(grant.allowed_domain, "example.com");

        assert_eq!(store.consume(&grant.token, file_id).await, Ok(()));
    }

    #[tokio::test]
    async fn test_tokens_are_unique_and_url_safe() {
        let store = store_with_ttl(StdDuration::from_secs(60));
        let file_id = Uuid::new_v4();

        let a = store.issue(file_id, "example.com").await;
        let b = store.issue(file_id, "example.com").await;
        assert_ne!(a.token, b.token);
        // base64url alphabet, no padding
        for token in [&a.token, &b.token] {
            assert!(token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
        assert_eq!(a.token.len(), b.token.len());
    }

    #[tokio::test]
    async fn test_second_consume_is_denied() {
        let store = store_with_ttl(StdDuration::from_secs(60));
        let file_id = Uuid::new_v4();

        let grant = store.issue(file_id, "example.com").await;
        assert_eq!(store.consume(&grant.token, file_id).await, Ok(()));
        assert_eq!(store.consume(&grant.token, file_id).await, Err(Denied));
    }

    #[tokio::test]
    async fn test_unknown_token_is_denied() {
        let store = store_with_ttl(StdDuration::from_secs(60));
        assert_eq!(
            store.consume("no-such-token", Uuid::new_v4()).await,
            Err(Denied)
        );
    }

    #[tokio::test]
    async fn test_expired_grant_is_denied() {
        let store = store_with_ttl(StdDuration::ZERO);
        let file_id = Uuid::new_v4();

        let grant = store.issue(file_id, "example.com").await;
        assert_eq!(store.consume(&grant.token, file_id).await, Err(Denied));
    }

    #[tokio::test]
    async fn test_file_binding() {
        let store = store_with_ttl(StdDuration::from_secs(60));
        let file_a = Uuid::new_v4();
        let file_b = Uuid::new_v4();

        let grant = store.issue(file_a, "example.com").await;
        assert_eq!(store.consume(&grant.token, file_b).await, Err(Denied));
        // The grant survives a mismatched attempt and is still good for A.
        assert_eq!(store.consume(&grant.token, file_a).await, Ok(()));
    }

    #[tokio::test]
    async fn test_at_most_once_under_concurrency() {
        let store = Arc::new(store_with_ttl(StdDuration::from_secs(60)));
        let file_id = Uuid::new_v4();
        let grant = store.issue(file_id, "example.com").await;

        let mut handles = Vec::new();
        for _ in 0..64 {
            let store = store.clone();
            let token = grant.token.clone();
            handles.push(tokio::spawn(
                async move { store.consume(&token, file_id).await },
            ));
        }

        let mut ok_count = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok_count += 1;
            }
        }
        assert_eq!(ok_count, 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let short = store_with_ttl(StdDuration::ZERO);
        let file_id = Uuid::new_v4();
        short.issue(file_id, "example.com").await;
        // issue() already sweeps, so a second issue drops the first entry
        short.issue(file_id, "example.com").await;
        short.sweep().await;
        assert_eq!(short.pending().await, 0);

        let long = store_with_ttl(StdDuration::from_secs(60));
        long.issue(file_id, "example.com").await;
        long.sweep().await;
        assert_eq!(long.pending().await, 1);
    }
}
