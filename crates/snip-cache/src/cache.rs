use parking_lot::Mutex;
use snip_core::{LinkRecord, ShortCode};
use std::collections::HashMap;
use tracing::debug;

/// The in-memory short-code map, and the sole source for resolution.
///
/// The cache is loaded once at boot from the durable store and updated
/// synchronously on every successful shorten call. It never evicts and
/// has no TTL: it grows for the lifetime of the process, which is an
/// accepted limitation of the design.
///
/// A single mutex guards the map end to end; there is no lock-free fast
/// path. `set` and `get` are O(1) amortized, `snapshot` is O(n).
#[derive(Debug, Default)]
pub struct LinkCache {
    inner: Mutex<HashMap<String, LinkRecord>>,
}

impl LinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-loads records at boot. Existing entries with the same code
    /// are overwritten.
    pub fn warm(&self, records: Vec<LinkRecord>) {
        let mut inner = self.inner.lock();
        for record in records {
            inner.insert(record.short_code.as_str().to_owned(), record);
        }
        debug!(entries = inner.len(), "link cache warmed");
    }

    /// Inserts or overwrites unconditionally. Last write wins; there is
    /// no existence check.
    pub fn set(&self, record: LinkRecord) {
        let mut inner = self.inner.lock();
        inner.insert(record.short_code.as_str().to_owned(), record);
    }

    /// Returns the original URL for `code`, if present.
    pub fn get(&self, code: &ShortCode) -> Option<String> {
        let inner = self.inner.lock();
        inner.get(code.as_str()).map(|r| r.original_url.clone())
    }

    /// Clones out every record, used to serialize the whole cache to the
    /// file fallback.
    pub fn snapshot(&self) -> Vec<LinkRecord> {
        let inner = self.inner.lock();
        inner.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
