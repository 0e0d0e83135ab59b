//! Wire Types
//!
//! JSON shapes exchanged with HTTP clients, wire-compatible with the IPFS
//! Pinning Service API, plus the request-ID codec that maps an opaque
//! client-facing string to the internal Pin ID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{PinRecord, PinStatusValue};
use crate::pin::error::ApiError;

/// A pin request as submitted by a client (`POST /pins`, `POST /pins/{id}`).
#[derive(Debug, Clone, Deserialize)]
pub struct PinRequest {
    pub cid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub origins: Vec<String>,
    #[serde(default)]
    pub meta: Option<Value>,
}

/// The nested `pin` object echoed back inside [`PinStatus`].
#[derive(Debug, Clone, Serialize)]
pub struct PinObject {
    pub cid: String,
    pub name: String,
    pub origins: Vec<String>,
    pub meta: Option<Value>,
}

/// A pin's current status, the response body for every pin-returning endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PinStatus {
    pub requestid: String,
    pub status: PinStatusValue,
    pub created: DateTime<Utc>,
    pub pin: PinObject,
    pub delegates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
}

impl PinStatus {
    /// Build a `PinStatus` from a persisted record and a set of delegate
    /// addresses obtained (best-effort) from `Backend.Identify`.
    #[must_use]
    pub fn from_record(record: &PinRecord, delegates: Vec<String>) -> Self {
        Self {
            requestid: encode_request_id(record.id),
            status: record.status,
            created: record.created_at,
            pin: PinObject {
                cid: record.cid.clone(),
                name: record.name.clone(),
                origins: record.origins.clone(),
                meta: record.meta.clone(),
            },
            delegates,
            info: None,
        }
    }
}

/// The body of `GET /pins`: a page of matching pins.
#[derive(Debug, Clone, Serialize)]
pub struct PinResults {
    pub count: usize,
    pub results: Vec<PinStatus>,
}

/// The nested `error` object of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureError {
    pub reason: String,
    pub details: String,
}

/// Strategies for matching a query's `name` against a pin's `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMatchingStrategy {
    #[default]
    Exact,
    Iexact,
    Partial,
    Ipartial,
}

impl TextMatchingStrategy {
    /// Parse a `match` query parameter value; unrecognized values are a
    /// client error rather than a silent fallback to `exact`.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        match raw {
            "exact" => Ok(Self::Exact),
            "iexact" => Ok(Self::Iexact),
            "partial" => Ok(Self::Partial),
            "ipartial" => Ok(Self::Ipartial),
            other => Err(ApiError::bad_request(format!(
                "unknown match strategy: {other}"
            ))),
        }
    }

    /// Does `haystack` match `needle` under this strategy?
    #[must_use]
    pub fn matches(self, haystack: &str, needle: &str) -> bool {
        match self {
            Self::Exact => haystack == needle,
            Self::Iexact => haystack.to_lowercase() == needle.to_lowercase(),
            Self::Partial => haystack.contains(needle),
            Self::Ipartial => haystack.to_lowercase().contains(&needle.to_lowercase()),
        }
    }
}

/// Encode an internal Pin ID as the client-facing request ID: lowercase hex
/// of the ID's unsigned 64-bit representation.
#[must_use]
pub fn encode_request_id(id: i64) -> String {
    format!("{:x}", id as u64)
}

/// Decode a client-supplied request ID back into an internal Pin ID.
///
/// Parse failures are `BadRequest`, never `NotFound` (invariant 3).
pub fn decode_request_id(raw: &str) -> Result<i64, ApiError> {
    u64::from_str_radix(raw, 16)
        .map(|v| v as i64)
        .map_err(|_| ApiError::bad_request(format!("malformed request id: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_round_trips() {
        for id in [0_i64, 1, 7, 9, 255, 65536, i64::MAX] {
            let encoded = encode_request_id(id);
            assert_eq!(decode_request_id(&encoded).unwrap(), id);
        }
    }

    #[test]
    fn request_id_rejects_malformed_input() {
        assert!(decode_request_id("zzzz").is_err());
        assert!(decode_request_id("").is_err());
    }

    #[test]
    fn match_strategies() {
        assert!(TextMatchingStrategy::Exact.matches("doc", "doc"));
        assert!(!TextMatchingStrategy::Exact.matches("Doc", "doc"));
        assert!(TextMatchingStrategy::Iexact.matches("Doc", "doc"));
        assert!(TextMatchingStrategy::Partial.matches("my document", "doc"));
        assert!(!TextMatchingStrategy::Partial.matches("my document", "DOC"));
        assert!(TextMatchingStrategy::Ipartial.matches("my Document", "doc"));
    }

    #[test]
    fn parses_known_strategies_only() {
        assert_eq!(
            TextMatchingStrategy::parse("ipartial").unwrap(),
            TextMatchingStrategy::Ipartial
        );
        assert!(TextMatchingStrategy::parse("fuzzy").is_err());
    }
}
