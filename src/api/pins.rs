//! Pinning Service HTTP Surface
//!
//! Wire-compatible with the IPFS Pinning Service API: parses and bounds
//! query parameters at the boundary, then delegates to [`PinHandler`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::pin::error::ApiError;
use crate::pin::query::{PinQuery, MAX_CID_LIST, MAX_STATUS_LIST};
use crate::pin::wire::{PinRequest, TextMatchingStrategy};

/// Raw query-string shape for `GET /pins`, parsed into a [`PinQuery`]
/// before being handed to [`PinHandler::pins`](crate::pin::PinHandler::pins).
#[derive(Debug, Deserialize)]
pub struct PinsQueryParams {
    cid: Option<String>,
    name: Option<String>,
    #[serde(rename = "match")]
    match_strategy: Option<String>,
    status: Option<String>,
    before: Option<DateTime<Utc>>,
    after: Option<DateTime<Utc>>,
    limit: Option<i64>,
}

impl PinsQueryParams {
    fn into_pin_query(self, default_limit: i64) -> Result<PinQuery, ApiError> {
        let cid: Vec<String> = self
            .cid
            .map(|raw| {
                raw.split(',')
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        if cid.len() > MAX_CID_LIST {
            return Err(ApiError::bad_request(format!(
                "cid list exceeds maximum of {MAX_CID_LIST}"
            )));
        }

        let match_strategy = match self.match_strategy {
            Some(raw) => TextMatchingStrategy::parse(&raw)?,
            None => TextMatchingStrategy::default(),
        };

        let status = match self.status {
            Some(raw) => {
                let parsed = raw
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(parse_status)
                    .collect::<Result<Vec<_>, _>>()?;
                if parsed.is_empty() || parsed.len() > MAX_STATUS_LIST {
                    return Err(ApiError::bad_request(format!(
                        "status list must have between 1 and {MAX_STATUS_LIST} elements"
                    )));
                }
                parsed
            }
            None => Vec::new(),
        };

        Ok(PinQuery {
            cid,
            name: self.name,
            match_strategy,
            status,
            before: self.before,
            after: self.after,
            limit: self.limit.unwrap_or(default_limit),
        })
    }
}

fn parse_status(raw: &str) -> Result<crate::db::PinStatusValue, ApiError> {
    use crate::db::PinStatusValue::{Failed, Pinned, Pinning, Queued};
    match raw {
        "queued" => Ok(Queued),
        "pinning" => Ok(Pinning),
        "pinned" => Ok(Pinned),
        "failed" => Ok(Failed),
        other => Err(ApiError::bad_request(format!("unknown status: {other}"))),
    }
}

/// `GET /pins`
pub async fn list_pins(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PinsQueryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.into_pin_query(state.config.default_query_limit)?;
    let results = state.handler.pins(&user, &query).await?;
    Ok((StatusCode::OK, Json(results)))
}

/// `POST /pins`
pub async fn add_pin(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<PinRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.handler.add_pin(&user, req).await?;
    Ok((StatusCode::ACCEPTED, Json(status)))
}

/// `GET /pins/{id}`
pub async fn get_pin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.handler.get_pin(&user, &id).await?;
    Ok((StatusCode::OK, Json(status)))
}

/// `POST /pins/{id}`
pub async fn update_pin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<PinRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.handler.update_pin(&user, &id, req).await?;
    Ok((StatusCode::OK, Json(status)))
}

/// `DELETE /pins/{id}`
pub async fn delete_pin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.handler.delete_pin(&user, &id).await?;
    Ok(StatusCode::ACCEPTED)
}
