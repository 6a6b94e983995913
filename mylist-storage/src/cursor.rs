//! Opaque pagination cursors.
//!
//! A cursor is the standard base64 encoding of `"<RFC 3339 addedAt>|<record id>"`
//! for the last item of a page. Cursors carry no server state and are not
//! signed: a forged cursor only moves a client within its own list.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use mylist_core::{EntityIdType, OrderingKey, RecordId, ValidationError};
use uuid::Uuid;

const SEPARATOR: char = '|';

/// Encode an ordering key as a cursor token.
pub fn encode(key: &OrderingKey) -> String {
    let raw = format!(
        "{}{}{}",
        key.added_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        SEPARATOR,
        key.record_id
    );
    STANDARD.encode(raw)
}

/// Decode a cursor token.
///
/// Only the exact output of [`encode`] is accepted; anything else, including
/// re-padded or re-cased variants of a valid token, is `InvalidCursor`.
pub fn decode(token: &str) -> Result<OrderingKey, ValidationError> {
    let bytes = STANDARD
        .decode(token)
        .map_err(|e| invalid(format!("not base64: {}", e)))?;
    let raw = String::from_utf8(bytes).map_err(|_| invalid("not utf-8"))?;

    let (added_at, record_id) = raw
        .split_once(SEPARATOR)
        .ok_or_else(|| invalid("missing separator"))?;

    let added_at = DateTime::parse_from_rfc3339(added_at)
        .map_err(|e| invalid(format!("bad timestamp: {}", e)))?
        .with_timezone(&Utc);
    let record_id = Uuid::parse_str(record_id)
        .map(RecordId::new)
        .map_err(|e| invalid(format!("bad record id: {}", e)))?;

    let key = OrderingKey {
        added_at,
        record_id,
    };
    if encode(&key) != token {
        return Err(invalid("not in canonical form"));
    }
    Ok(key)
}

fn invalid(reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidCursor {
        reason: reason.into(),
    }
}
