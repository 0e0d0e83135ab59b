//! Database Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required). Every
//! mutating function is generic over `sqlx::PgExecutor` so call sites
//! choose whether to run against the pool directly or against an open
//! transaction — the core never assumes a specific execution context.

use sqlx::PgExecutor;
use uuid::Uuid;

use super::models::{PinRecord, PinStatusValue, Token, User};

// ============================================================================
// User Queries
// ============================================================================

/// Create a new user.
pub async fn create_user<'e, E>(executor: E, name: &str) -> sqlx::Result<User>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        "INSERT INTO users (name) VALUES ($1) RETURNING id, name, created_at",
    )
    .bind(name)
    .fetch_one(executor)
    .await
}

/// Find a user by surrogate ID.
pub async fn find_user_by_id<'e, E>(executor: E, id: Uuid) -> sqlx::Result<Option<User>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>("SELECT id, name, created_at FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Find a user by name.
pub async fn find_user_by_name<'e, E>(executor: E, name: &str) -> sqlx::Result<Option<User>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>("SELECT id, name, created_at FROM users WHERE name = $1")
        .bind(name)
        .fetch_optional(executor)
        .await
}

// ============================================================================
// Token Queries
// ============================================================================

/// Create a new token for a user. `token_hash` is the SHA-256 hex digest
/// of the raw bearer string — the raw value is never persisted.
pub async fn create_token<'e, E>(
    executor: E,
    user_id: Uuid,
    token_hash: &str,
) -> sqlx::Result<Token>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Token>(
        "INSERT INTO tokens (user_id, token_hash) VALUES ($1, $2)
         RETURNING id, token_hash, user_id, created_at",
    )
    .bind(user_id)
    .bind(token_hash)
    .fetch_one(executor)
    .await
}

/// Resolve the owning user for a hashed bearer token. Returns `None` both
/// when the hash is unknown and when its owning user has since vanished
/// (which cannot currently happen since users are never deleted, but the
/// join makes the invariant structural rather than assumed).
pub async fn find_user_by_token_hash<'e, E>(
    executor: E,
    token_hash: &str,
) -> sqlx::Result<Option<User>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        "SELECT u.id, u.name, u.created_at
         FROM users u
         JOIN tokens t ON t.user_id = u.id
         WHERE t.token_hash = $1",
    )
    .bind(token_hash)
    .fetch_optional(executor)
    .await
}

/// Revoke a token by ID (immediately invalidates the credential).
pub async fn delete_token<'e, E>(executor: E, id: Uuid) -> sqlx::Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM tokens WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

// ============================================================================
// Pin Queries
// ============================================================================

const PIN_COLUMNS: &str =
    "id, user_id, created_at, updated_at, status, name, cid, origins, meta";

/// Insert a new pin request, owned by `user_id`, in `queued` status.
pub async fn insert_pin<'e, E>(
    executor: E,
    user_id: Uuid,
    name: &str,
    cid: &str,
    origins: &[String],
    meta: Option<&serde_json::Value>,
) -> sqlx::Result<PinRecord>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PinRecord>(&format!(
        "INSERT INTO pins (user_id, status, name, cid, origins, meta)
         VALUES ($1, 'queued', $2, $3, $4, $5)
         RETURNING {PIN_COLUMNS}"
    ))
    .bind(user_id)
    .bind(name)
    .bind(cid)
    .bind(origins)
    .bind(meta)
    .fetch_one(executor)
    .await
}

/// Find a pin by its internal ID, scoped to `owner` — a pin owned by
/// someone else is indistinguishable from a nonexistent one (invariant 5).
pub async fn find_pin_for_owner<'e, E>(
    executor: E,
    id: i64,
    owner: Uuid,
) -> sqlx::Result<Option<PinRecord>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PinRecord>(&format!(
        "SELECT {PIN_COLUMNS} FROM pins WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(executor)
    .await
}

/// Find a pin by internal ID regardless of owner. Used by the queue
/// worker to re-read the current status immediately before writing a new
/// one, so the transition can be checked against what's actually in the
/// Store rather than a possibly-stale copy carried in the job.
pub async fn find_pin_by_id<'e, E>(executor: E, id: i64) -> sqlx::Result<Option<PinRecord>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PinRecord>(&format!("SELECT {PIN_COLUMNS} FROM pins WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// List every pin owned by `owner`. The [`crate::pin::query`] matcher
/// applies CID/name/status/time filtering and ordering/limit in memory
/// rather than pushing the predicate into SQL.
pub async fn list_pins_for_owner<'e, E>(executor: E, owner: Uuid) -> sqlx::Result<Vec<PinRecord>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PinRecord>(&format!(
        "SELECT {PIN_COLUMNS} FROM pins WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(owner)
    .fetch_all(executor)
    .await
}

/// Replace a pin's mutable content (CID/name/origins/meta) and reset its
/// status to `queued`, bumping `updated_at`. Used by `UpdatePin`.
pub async fn replace_pin_content<'e, E>(
    executor: E,
    id: i64,
    name: &str,
    cid: &str,
    origins: &[String],
    meta: Option<&serde_json::Value>,
) -> sqlx::Result<PinRecord>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PinRecord>(&format!(
        "UPDATE pins
         SET name = $2, cid = $3, origins = $4, meta = $5,
             status = 'queued', updated_at = now()
         WHERE id = $1
         RETURNING {PIN_COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(cid)
    .bind(origins)
    .bind(meta)
    .fetch_one(executor)
    .await
}

/// Persist a status transition. Each transition is a single, independent
/// statement — the caller is responsible for running it in its own
/// transaction.
pub async fn update_pin_status<'e, E>(
    executor: E,
    id: i64,
    status: PinStatusValue,
) -> sqlx::Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("UPDATE pins SET status = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Delete a pin outright. The only path that destroys a Pin entity
/// (`DeletePin`, after the backend unpin succeeds).
pub async fn delete_pin<'e, E>(executor: E, id: i64) -> sqlx::Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM pins WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// List all pins currently in a non-terminal status, across all owners.
/// Used once at startup to rehydrate in-flight jobs abandoned by a
/// previous crash.
pub async fn list_pending_pins<'e, E>(executor: E) -> sqlx::Result<Vec<PinRecord>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PinRecord>(&format!(
        "SELECT {PIN_COLUMNS} FROM pins WHERE status IN ('queued', 'pinning')"
    ))
    .fetch_all(executor)
    .await
}
