use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};

use crate::error::{StorageError, StorageResult};

/// An opaque pagination cursor: `base64(<iso8601_timestamp>|<memory_id>)`.
/// Clients only ever round-trip it through `encode`/`decode`; the wire
/// format is not part of the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub timestamp: DateTime<Utc>,
    pub memory_id: String,
}

impl Cursor {
    pub fn new(timestamp: DateTime<Utc>, memory_id: impl Into<String>) -> Self {
        Self {
            timestamp,
            memory_id: memory_id.into(),
        }
    }

    pub fn encode(&self) -> String {
        let payload = format!("{}|{}", self.timestamp.to_rfc3339(), self.memory_id);
        general_purpose::STANDARD.encode(payload)
    }

    pub fn decode(cursor: &str) -> StorageResult<Self> {
        let bytes = general_purpose::STANDARD
            .decode(cursor)
            .map_err(|e| StorageError::CursorDecodeError(e.to_string()))?;
        let payload = String::from_utf8(bytes)
            .map_err(|e| StorageError::CursorDecodeError(e.to_string()))?;
        let (ts, memory_id) = payload
            .split_once('|')
            .ok_or_else(|| StorageError::CursorDecodeError("missing separator".to_string()))?;
        if memory_id.is_empty() {
            return Err(StorageError::CursorDecodeError("empty memory id".to_string()));
        }
        let timestamp = DateTime::parse_from_rfc3339(ts)
            .map_err(|e| StorageError::CursorDecodeError(e.to_string()))?
            .with_timezone(&Utc);
        Ok(Self {
            timestamp,
            memory_id: memory_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_and_decode() {
        let cursor = Cursor::new(Utc::now(), "mem-123");
        let decoded = Cursor::decode(&cursor.encode()).unwrap();
        assert_eq!(cursor, decoded);
    }

    #[test]
    fn decode_then_encode_reproduces_the_same_string() {
        let original = Cursor::new(Utc::now(), "mem-456").encode();
        let decoded = Cursor::decode(&original).unwrap();
        assert_eq!(decoded.encode(), original);
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(Cursor::decode("not valid base64!!").is_err());
        let missing_separator = general_purpose::STANDARD.encode("no-separator-here");
        assert!(Cursor::decode(&missing_separator).is_err());
    }
}
