//! Bearer Token Authentication
//!
//! The daemon's only credential is an opaque bearer token, created and
//! revoked out-of-band by an administrative tool. This module resolves an
//! incoming `Authorization: Bearer <token>` header to the owning
//! [`crate::db::User`].

mod middleware;

pub use middleware::{require_auth, AuthUser};

/// Hash a bearer token for storage/lookup using SHA-256.
///
/// Tokens are never stored or compared in the clear — only their digest.
#[must_use]
pub fn hash_token(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
