//! # Cursor Utilities
//!
//! Opaque base64 pagination cursors over the `(created_at, id)` keyset used
//! by the listing endpoints. Connections and introduction requests can be
//! arbitrarily old, so no recency window is imposed on decoded timestamps;
//! the checks here only reject malformed or abusive input.

use crate::error::ApiError;
use axum::http::StatusCode;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Keyset position encoded into a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorData {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

/// Encode cursor data as an opaque base64 string
pub fn encode_cursor(created_at: &DateTime<Utc>, id: &Uuid) -> String {
    let cursor_data = CursorData {
        created_at: *created_at,
        id: *id,
    };
    let json = serde_json::to_string(&cursor_data).expect("cursor data serializes");
    base64::engine::general_purpose::STANDARD.encode(json.as_bytes())
}

/// Decode cursor data from an opaque base64 string with validation
pub fn decode_cursor(cursor: &str) -> Result<CursorData, ApiError> {
    if cursor.is_empty() {
        return Err(invalid_cursor("cursor cannot be empty"));
    }

    // Bound raw input before doing any decoding work.
    if cursor.len() > 1000 {
        return Err(invalid_cursor("cursor is too long"));
    }

    if !cursor
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
    {
        return Err(invalid_cursor("cursor contains invalid characters"));
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(cursor)
        .map_err(|_| invalid_cursor("cursor is not valid base64"))?;

    if decoded.len() > 500 {
        return Err(invalid_cursor("decoded cursor is too large"));
    }

    let json = String::from_utf8(decoded)
        .map_err(|_| invalid_cursor("cursor contains invalid UTF-8 data"))?;

    let cursor_data: CursorData = serde_json::from_str(&json)
        .map_err(|_| invalid_cursor("cursor contains invalid JSON structure"))?;

    if cursor_data.id == Uuid::nil() {
        return Err(invalid_cursor("cursor contains invalid ID"));
    }

    Ok(cursor_data)
}

fn invalid_cursor(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
}
