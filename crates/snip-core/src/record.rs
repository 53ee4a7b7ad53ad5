use crate::shortcode::ShortCode;
use serde::{Deserialize, Serialize};

/// A stored short link mapping.
///
/// The short code is both the primary key and the public path segment.
/// Records are immutable after creation except for the `is_deleted`
/// tombstone, which is set exactly once by the deletion pipeline and
/// never reverted. Records are never physically removed.
///
/// The serialized form matches the flat-file format: a JSON array of
/// objects with `short_url`, `original_url`, `user_id`, `is_deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// The short code identifying this link.
    #[serde(rename = "short_url")]
    pub short_code: ShortCode,
    /// The long URL this link points at. Logically unique per store.
    pub original_url: String,
    /// Identity of the creator. Empty string means anonymous.
    #[serde(rename = "user_id", default)]
    pub owner_id: String,
    /// Soft-delete tombstone. Monotonic: never reverts to `false`.
    #[serde(default)]
    pub is_deleted: bool,
}

impl LinkRecord {
    /// Creates a live (non-deleted) record.
    pub fn new(
        short_code: ShortCode,
        original_url: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            short_code,
            original_url: original_url.into(),
            owner_id: owner_id.into(),
            is_deleted: false,
        }
    }
}

/// A request to mark a short link as deleted, if owned by this identity.
///
/// Intents are ephemeral: they exist only in transit through the deletion
/// pipeline's channels and flush buffer, and are discharged once handed to
/// the store's batch tombstone call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeleteIntent {
    pub owner_id: String,
    pub short_code: ShortCode,
}

impl DeleteIntent {
    pub fn new(owner_id: impl Into<String>, short_code: ShortCode) -> Self {
        Self {
            owner_id: owner_id.into(),
            short_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_format_field_names() {
        let record = LinkRecord::new(
            ShortCode::new_unchecked("abc123"),
            "https://example.com",
            "user-1",
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["short_url"], "abc123");
        assert_eq!(json["original_url"], "https://example.com");
        assert_eq!(json["user_id"], "user-1");
        assert_eq!(json["is_deleted"], false);
    }

    #[test]
    fn missing_optional_fields_default() {
        let record: LinkRecord = serde_json::from_str(
            r#"{"short_url": "abc123", "original_url": "https://example.com"}"#,
        )
        .unwrap();

        assert_eq!(record.owner_id, "");
        assert!(!record.is_deleted);
    }
}
