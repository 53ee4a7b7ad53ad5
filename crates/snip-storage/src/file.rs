use async_trait::async_trait;
use snip_core::{DeleteIntent, LinkRecord, LinkStore, Result, ShortCode, StoreError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Flat-file implementation of the store contract.
///
/// The whole data set is one JSON array of records. There is no
/// incremental append: every mutating call rewrites the complete file.
/// A missing file reads as an empty store. An async mutex serializes
/// mutating calls so concurrent load-modify-save cycles cannot
/// interleave.
///
/// The store doubles as the write path's snapshot sink: [`save`] accepts
/// an arbitrary record set, which the orchestrator feeds from the cache.
///
/// [`save`]: FileStore::save
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the full record set. A missing file is an empty store.
    pub async fn load(&self) -> Result<Vec<LinkRecord>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "storage file does not exist yet");
                return Ok(Vec::new());
            }
            Err(err) => return Err(StoreError::Unavailable(err.to_string())),
        };

        serde_json::from_slice(&bytes).map_err(|err| StoreError::InvalidData(err.to_string()))
    }

    /// Replaces the file contents with `records`, creating the parent
    /// directory if needed.
    pub async fn save(&self, records: &[LinkRecord]) -> Result<()> {
        let bytes = serde_json::to_vec(records)
            .map_err(|err| StoreError::Operation(err.to_string()))?;

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|err| StoreError::Unavailable(err.to_string()))?;
            }
        }

        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }
}

#[async_trait]
impl LinkStore for FileStore {
    async fn insert(&self, record: &LinkRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await?;
        if records
            .iter()
            .any(|existing| existing.original_url == record.original_url)
        {
            return Err(StoreError::Conflict(record.original_url.clone()));
        }

        records.push(record.clone());
        self.save(&records).await
    }

    async fn insert_batch(&self, batch: &[LinkRecord]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await?;
        records.extend_from_slice(batch);
        self.save(&records).await
    }

    async fn lookup_by_original(&self, original_url: &str) -> Result<ShortCode> {
        self.load()
            .await?
            .into_iter()
            .find(|record| record.original_url == original_url)
            .map(|record| record.short_code)
            .ok_or(StoreError::NotFound)
    }

    async fn lookup_by_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|record| record.owner_id == owner_id && !record.is_deleted)
            .collect())
    }

    async fn batch_tombstone(&self, intents: &[DeleteIntent]) -> Result<()> {
        if intents.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;

        let requested: HashSet<(&str, &str)> = intents
            .iter()
            .map(|intent| (intent.owner_id.as_str(), intent.short_code.as_str()))
            .collect();

        let mut records = self.load().await?;
        for record in &mut records {
            if requested.contains(&(record.owner_id.as_str(), record.short_code.as_str())) {
                record.is_deleted = true;
            }
        }

        self.save(&records).await
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<LinkRecord>> {
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, url: &str, owner: &str) -> LinkRecord {
        LinkRecord::new(ShortCode::new_unchecked(code), url, owner)
    }

    fn store_in(dir: &tempfile::TempDir) -> FileStore {
        FileStore::new(dir.path().join("data.json"))
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store
            .insert(&record("abc123", "https://example.com", "user-1"))
            .await
            .unwrap();

        let records = store.load_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].original_url, "https://example.com");
        assert_eq!(records[0].owner_id, "user-1");
    }

    #[tokio::test]
    async fn duplicate_original_url_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store
            .insert(&record("abc123", "https://example.com", ""))
            .await
            .unwrap();

        let err = store
            .insert(&record("xyz789", "https://example.com", ""))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let existing = store.lookup_by_original("https://example.com").await.unwrap();
        assert_eq!(existing.as_str(), "abc123");
    }

    #[tokio::test]
    async fn lookup_by_original_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let err = store.lookup_by_original("https://nope.example").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn tombstone_marks_only_owned_codes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store
            .insert(&record("aaa111", "https://one.example", "alice"))
            .await
            .unwrap();
        store
            .insert(&record("bbb222", "https://two.example", "bob"))
            .await
            .unwrap();

        // One owned intent, one for someone else's code, one for a code
        // that does not exist. Only the first may take effect.
        store
            .batch_tombstone(&[
                DeleteIntent::new("alice", ShortCode::new_unchecked("aaa111")),
                DeleteIntent::new("alice", ShortCode::new_unchecked("bbb222")),
                DeleteIntent::new("alice", ShortCode::new_unchecked("ghost1")),
            ])
            .await
            .unwrap();

        let records = store.load_all().await.unwrap();
        let deleted: Vec<&str> = records
            .iter()
            .filter(|r| r.is_deleted)
            .map(|r| r.short_code.as_str())
            .collect();
        assert_eq!(deleted, vec!["aaa111"]);
    }

    #[tokio::test]
    async fn lookup_by_owner_hides_tombstoned() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store
            .insert(&record("aaa111", "https://one.example", "alice"))
            .await
            .unwrap();
        store
            .insert(&record("bbb222", "https://two.example", "alice"))
            .await
            .unwrap();
        store
            .batch_tombstone(&[DeleteIntent::new(
                "alice",
                ShortCode::new_unchecked("aaa111"),
            )])
            .await
            .unwrap();

        let records = store.lookup_by_owner("alice").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].short_code.as_str(), "bbb222");
    }

    #[tokio::test]
    async fn save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested/deep/data.json"));

        store
            .save(&[record("abc123", "https://example.com", "")])
            .await
            .unwrap();

        assert_eq!(store.load().await.unwrap().len(), 1);
    }
}
