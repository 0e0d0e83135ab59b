//! Database Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Identity principal. Owns Tokens and Pins.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    /// Unique, stable surrogate ID.
    pub id: Uuid,
    /// Unique display/login name.
    pub name: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Bearer credential. The raw token is never stored — only its SHA-256
/// hash (see [`crate::auth::hash_token`]) — so a leaked database dump does
/// not leak usable credentials.
#[derive(Debug, Clone, FromRow)]
pub struct Token {
    /// Surrogate ID.
    pub id: Uuid,
    /// SHA-256 hash (hex) of the opaque bearer token string.
    pub token_hash: String,
    /// Owning user.
    pub user_id: Uuid,
    /// When the token was issued.
    pub created_at: DateTime<Utc>,
}

/// Status a pin request can be in at the pinning service.
///
/// Backed by a Postgres enum type (`pin_status`) rather than free-form text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "pin_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PinStatusValue {
    Queued,
    Pinning,
    Pinned,
    Failed,
}

/// A pin request record, as stored.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PinRecord {
    /// Surrogate ID; source of the hex-encoded `requestid` exposed to clients.
    pub id: i64,
    /// Owning user.
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: PinStatusValue,
    pub name: String,
    pub cid: String,
    pub origins: Vec<String>,
    pub meta: Option<serde_json::Value>,
}
