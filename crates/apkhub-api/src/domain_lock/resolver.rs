//! Decision logic for the gated download endpoint.

use super::grant_store::GrantStore;
use uuid::Uuid;

/// Outcome of the download gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Stream the file to the caller.
    Serve,
    /// Refuse with a generic denial. The caller must not learn why.
    Deny,
}

/// Decide whether a download request may proceed.
///
/// `lock` is the file's current allowed domain, read fresh from the database
/// by the caller. An unlocked file is served unconditionally, token or not.
/// A locked file requires a token that consumes successfully for this exact
/// file; consumption is the point of no return, so two requests carrying the
/// same token cannot both be served.
pub async fn resolve(
    lock: Option<&str>,
    token: Option<&str>,
    file_id: Uuid,
    grants: &GrantStore,
) -> GateDecision {
    if lock.is_none() {
        return GateDecision::Serve;
    }

    let Some(token) = token else {
        return GateDecision::Deny;
    };
    if token.is_empty() {
        return GateDecision::Deny;
    }

    match grants.consume(token, file_id).await {
        Ok(()) => GateDecision::Serve,
        Err(_) => GateDecision::Deny,
    }
}
