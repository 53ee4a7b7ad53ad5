use async_trait::async_trait;
use dashmap::DashMap;
use snip_core::{DeleteIntent, LinkRecord, LinkStore, Result, ShortCode, StoreError};

/// In-memory implementation of the store contract, backed by DashMap.
///
/// Primarily a test double with real semantics, but usable as an
/// ephemeral backend. Keyed by short code; the original-URL uniqueness
/// check is a scan, which is fine at test scale.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<String, LinkRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn original_exists(&self, original_url: &str) -> bool {
        self.records
            .iter()
            .any(|entry| entry.original_url == original_url)
    }
}

#[async_trait]
impl LinkStore for InMemoryStore {
    async fn insert(&self, record: &LinkRecord) -> Result<()> {
        if self.original_exists(&record.original_url) {
            return Err(StoreError::Conflict(record.original_url.clone()));
        }

        self.records
            .insert(record.short_code.as_str().to_owned(), record.clone());
        Ok(())
    }

    async fn insert_batch(&self, records: &[LinkRecord]) -> Result<()> {
        for record in records {
            self.records
                .insert(record.short_code.as_str().to_owned(), record.clone());
        }
        Ok(())
    }

    async fn lookup_by_original(&self, original_url: &str) -> Result<ShortCode> {
        self.records
            .iter()
            .find(|entry| entry.original_url == original_url)
            .map(|entry| entry.short_code.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn lookup_by_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.owner_id == owner_id && !entry.is_deleted)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn batch_tombstone(&self, intents: &[DeleteIntent]) -> Result<()> {
        for intent in intents {
            if let Some(mut entry) = self.records.get_mut(intent.short_code.as_str()) {
                if entry.owner_id == intent.owner_id {
                    entry.is_deleted = true;
                }
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<LinkRecord>> {
        Ok(self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, url: &str, owner: &str) -> LinkRecord {
        LinkRecord::new(ShortCode::new_unchecked(code), url, owner)
    }

    #[tokio::test]
    async fn insert_and_lookup_by_original() {
        let store = InMemoryStore::new();

        store
            .insert(&record("abc123", "https://example.com", ""))
            .await
            .unwrap();

        let code = store.lookup_by_original("https://example.com").await.unwrap();
        assert_eq!(code.as_str(), "abc123");
    }

    #[tokio::test]
    async fn duplicate_original_url_is_conflict() {
        let store = InMemoryStore::new();

        store
            .insert(&record("abc123", "https://example.com", ""))
            .await
            .unwrap();

        let err = store
            .insert(&record("xyz789", "https://example.com", ""))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn batch_insert_skips_conflict_detection() {
        let store = InMemoryStore::new();

        store
            .insert(&record("abc123", "https://example.com", ""))
            .await
            .unwrap();

        // Batch mode is best-effort bulk: no per-item conflict checks.
        store
            .insert_batch(&[record("xyz789", "https://example.com", "")])
            .await
            .unwrap();

        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn tombstone_requires_matching_owner() {
        let store = InMemoryStore::new();

        store
            .insert(&record("abc123", "https://example.com", "alice"))
            .await
            .unwrap();

        store
            .batch_tombstone(&[DeleteIntent::new(
                "mallory",
                ShortCode::new_unchecked("abc123"),
            )])
            .await
            .unwrap();
        assert!(!store.lookup_by_owner("alice").await.unwrap()[0].is_deleted);

        store
            .batch_tombstone(&[DeleteIntent::new(
                "alice",
                ShortCode::new_unchecked("abc123"),
            )])
            .await
            .unwrap();
        assert!(store.lookup_by_owner("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tombstone_is_monotonic() {
        let store = InMemoryStore::new();

        store
            .insert(&record("abc123", "https://example.com", "alice"))
            .await
            .unwrap();

        let intent = DeleteIntent::new("alice", ShortCode::new_unchecked("abc123"));
        store.batch_tombstone(std::slice::from_ref(&intent)).await.unwrap();
        store.batch_tombstone(std::slice::from_ref(&intent)).await.unwrap();

        let all = store.load_all().await.unwrap();
        assert!(all[0].is_deleted);
    }
}
