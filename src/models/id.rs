//! Record identifiers

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque primary key of a backend row.
///
/// The backend hands out uuids for accounts and may use either uuids or
/// bigints for content tables, so decoding accepts JSON strings and
/// integers alike. The identifier is always carried as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Fresh random identifier (used by the in-memory backend)
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Int(n) => Self(n.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_uuid_string() {
        let id: RecordId = serde_json::from_str("\"5f1c1d6e-0000-4000-8000-000000000001\"").unwrap();
        assert_eq!(id.as_str(), "5f1c1d6e-0000-4000-8000-000000000001");
    }

    #[test]
    fn test_decodes_bigint() {
        let id: RecordId = serde_json::from_str("42").unwrap();
        assert_eq!(id, RecordId::from("42"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&RecordId::from("7")).unwrap();
        assert_eq!(json, "\"7\"");
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(RecordId::random(), RecordId::random());
    }
}
