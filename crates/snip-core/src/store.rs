use crate::error::Result;
use crate::record::{DeleteIntent, LinkRecord};
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// Contract for durable short link storage.
///
/// Implementations are selected once at boot (relational database
/// preferred, flat file as fallback) and are never swapped at runtime.
/// The cache, not the store, is the authoritative read path for
/// resolution; the store exists to survive restarts and to carry the
/// tombstone state.
#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    /// Inserts one record.
    ///
    /// A uniqueness violation on the original URL must be reported as
    /// [`StoreError::Conflict`], not as a generic failure.
    ///
    /// [`StoreError::Conflict`]: crate::StoreError::Conflict
    async fn insert(&self, record: &LinkRecord) -> Result<()>;

    /// Best-effort bulk insert. No per-item conflict resolution.
    async fn insert_batch(&self, records: &[LinkRecord]) -> Result<()>;

    /// Returns the short code already mapped to `original_url`.
    ///
    /// Used only after [`insert`] reported a conflict, to hand the caller
    /// the pre-existing code. Returns [`StoreError::NotFound`] when no
    /// mapping exists.
    ///
    /// [`insert`]: LinkStore::insert
    /// [`StoreError::NotFound`]: crate::StoreError::NotFound
    async fn lookup_by_original(&self, original_url: &str) -> Result<ShortCode>;

    /// Returns all live (non-tombstoned) records created by `owner_id`.
    async fn lookup_by_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>>;

    /// Sets `is_deleted = true` for every record whose owner and short
    /// code match an intent. Intents for non-owned or non-existent codes
    /// are silently ignored; there is no per-intent failure reporting.
    async fn batch_tombstone(&self, intents: &[DeleteIntent]) -> Result<()>;

    /// Liveness probe.
    async fn ping(&self) -> Result<()>;

    /// Returns every record in the store, used to warm the cache at boot.
    async fn load_all(&self) -> Result<Vec<LinkRecord>>;
}
