use crate::error::ServiceError;
use crate::generator::Generator;
use snip_cache::LinkCache;
use snip_core::{LinkRecord, LinkStore, ShortCode, StoreError};
use snip_storage::FileStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of a shorten call.
///
/// `conflict` means the original URL was already mapped and `code` is
/// the pre-existing short code. It is still a usable short URL, not a
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortened {
    pub code: ShortCode,
    pub conflict: bool,
}

/// Coordinates the cache and the durable store on the write path.
///
/// The cache is updated synchronously and unconditionally before the
/// store is touched, and it is never rolled back: a store failure
/// degrades durability, not observable correctness, for the current
/// process lifetime. The cache and the store are eventually consistent
/// and never transactionally coupled.
///
/// When a snapshot file is configured alongside the primary store
/// (layered fallback), every write also persists the full cache
/// snapshot; the overall call fails only when the primary store and the
/// snapshot both fail.
#[derive(Debug)]
pub struct LinkService<S, G> {
    cache: Arc<LinkCache>,
    store: Arc<S>,
    snapshot: Option<Arc<FileStore>>,
    generator: G,
}

impl<S: LinkStore, G: Generator> LinkService<S, G> {
    pub fn new(cache: Arc<LinkCache>, store: Arc<S>, generator: G) -> Self {
        Self {
            cache,
            store,
            snapshot: None,
            generator,
        }
    }

    /// Adds a snapshot file persisted on every write in addition to the
    /// primary store.
    pub fn with_snapshot(mut self, snapshot: Arc<FileStore>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Loads every stored record into the cache. Called once at boot;
    /// the store is not consulted on the read path afterward.
    pub async fn warm_cache(&self) -> Result<usize, ServiceError> {
        let records = self.store.load_all().await?;
        let count = records.len();
        self.cache.warm(records);
        Ok(count)
    }

    /// Shortens one URL.
    ///
    /// The new mapping is visible to `resolve` as soon as this returns,
    /// even when the durable store rejected the write. A duplicate
    /// original URL resolves to the pre-existing code with
    /// `conflict = true`.
    pub async fn shorten(
        &self,
        original_url: &str,
        owner_id: &str,
    ) -> Result<Shortened, ServiceError> {
        validate_url(original_url)?;

        let code = self.generator.generate();
        let record = LinkRecord::new(code.clone(), original_url, owner_id);
        self.cache.set(record.clone());

        let mut store_failed = false;
        match self.store.insert(&record).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                let existing = self
                    .store
                    .lookup_by_original(original_url)
                    .await
                    .map_err(|err| {
                        error!(error = %err, "failed to look up existing code after conflict");
                        ServiceError::Store(err)
                    })?;
                info!(code = %existing, "original url already mapped, returning existing code");
                return Ok(Shortened {
                    code: existing,
                    conflict: true,
                });
            }
            Err(err) => {
                warn!(error = %err, "failed to insert link into durable store");
                store_failed = true;
            }
        }

        if let Some(snapshot_err) = self.persist_snapshot().await {
            if store_failed {
                return Err(ServiceError::Store(snapshot_err));
            }
        }

        Ok(Shortened {
            code,
            conflict: false,
        })
    }

    /// Shortens a batch of URLs keyed by caller-chosen correlation ids.
    ///
    /// Unlike [`shorten`], batch mode performs no per-item conflict
    /// lookup: a uniqueness conflict inside the batch surfaces as a
    /// logged store failure and the generated codes are returned as-is.
    ///
    /// [`shorten`]: LinkService::shorten
    pub async fn shorten_batch(
        &self,
        urls: HashMap<String, String>,
        owner_id: &str,
    ) -> Result<HashMap<String, ShortCode>, ServiceError> {
        let mut codes = HashMap::with_capacity(urls.len());
        let mut records = Vec::with_capacity(urls.len());

        for (correlation_id, original_url) in urls {
            let code = self.generator.generate();
            let record = LinkRecord::new(code.clone(), original_url, owner_id);
            self.cache.set(record.clone());
            records.push(record);
            codes.insert(correlation_id, code);
        }

        let mut store_failed = false;
        if let Err(err) = self.store.insert_batch(&records).await {
            warn!(
                error = %err,
                count = records.len(),
                "failed to batch insert links into durable store"
            );
            store_failed = true;
        }

        if let Some(snapshot_err) = self.persist_snapshot().await {
            if store_failed {
                return Err(ServiceError::Store(snapshot_err));
            }
        }

        Ok(codes)
    }

    /// Resolves a short code to its original URL, from the cache only.
    pub fn resolve(&self, code: &ShortCode) -> Result<String, ServiceError> {
        self.cache.get(code).ok_or(ServiceError::NotFound)
    }

    /// Lists the live records created by `owner_id`.
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>, ServiceError> {
        Ok(self.store.lookup_by_owner(owner_id).await?)
    }

    /// Durable store liveness, for health-check reporting.
    pub async fn ping(&self) -> Result<(), ServiceError> {
        Ok(self.store.ping().await?)
    }

    async fn persist_snapshot(&self) -> Option<StoreError> {
        let snapshot = self.snapshot.as_ref()?;
        match snapshot.save(&self.cache.snapshot()).await {
            Ok(()) => None,
            Err(err) => {
                error!(error = %err, "failed to persist cache snapshot");
                Some(err)
            }
        }
    }
}

fn validate_url(url: &str) -> Result<(), ServiceError> {
    if url.is_empty() {
        return Err(ServiceError::InvalidUrl("url cannot be empty".to_owned()));
    }

    let Some((scheme, rest)) = url.split_once("://") else {
        return Err(ServiceError::InvalidUrl(format!(
            "url must have a scheme and host: {url}"
        )));
    };

    if rest.is_empty() {
        return Err(ServiceError::InvalidUrl(format!(
            "url must have a host: {url}"
        )));
    }

    match scheme.to_ascii_lowercase().as_str() {
        "http" | "https" => Ok(()),
        other => Err(ServiceError::InvalidUrl(format!(
            "url scheme must be http or https: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::SeqGenerator;
    use snip_storage::InMemoryStore;

    fn service_with(
        store: Arc<InMemoryStore>,
    ) -> LinkService<InMemoryStore, SeqGenerator> {
        LinkService::new(
            Arc::new(LinkCache::new()),
            store,
            SeqGenerator::with_prefix("sn"),
        )
    }

    #[tokio::test]
    async fn shorten_then_resolve_returns_same_url() {
        let service = service_with(Arc::new(InMemoryStore::new()));

        let shortened = service.shorten("https://example.com", "").await.unwrap();
        assert!(!shortened.conflict);

        let url = service.resolve(&shortened.code).unwrap();
        assert_eq!(url, "https://example.com");
    }

    #[tokio::test]
    async fn duplicate_url_returns_existing_code_with_conflict() {
        let service = service_with(Arc::new(InMemoryStore::new()));

        let first = service.shorten("https://example.com", "").await.unwrap();
        let second = service.shorten("https://example.com", "").await.unwrap();

        assert!(!first.conflict);
        assert!(second.conflict);
        assert_eq!(first.code, second.code);
    }

    #[tokio::test]
    async fn resolve_missing_code_is_not_found() {
        let service = service_with(Arc::new(InMemoryStore::new()));

        let err = service
            .resolve(&ShortCode::new_unchecked("nope42"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[tokio::test]
    async fn invalid_urls_are_rejected() {
        let service = service_with(Arc::new(InMemoryStore::new()));

        for bad in ["", "not-a-url", "ftp://example.com", "https://"] {
            let err = service.shorten(bad, "").await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidUrl(_)), "url: {bad}");
        }
    }

    #[tokio::test]
    async fn store_failure_still_serves_from_cache() {
        let service = LinkService::new(
            Arc::new(LinkCache::new()),
            Arc::new(failing::FailingStore),
            SeqGenerator::with_prefix("sn"),
        );

        let shortened = service.shorten("https://example.com", "").await.unwrap();
        assert!(!shortened.conflict);
        assert_eq!(
            service.resolve(&shortened.code).unwrap(),
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn store_failure_with_healthy_snapshot_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Arc::new(FileStore::new(dir.path().join("data.json")));

        let service = LinkService::new(
            Arc::new(LinkCache::new()),
            Arc::new(failing::FailingStore),
            SeqGenerator::with_prefix("sn"),
        )
        .with_snapshot(Arc::clone(&snapshot));

        service.shorten("https://example.com", "").await.unwrap();

        let persisted = snapshot.load().await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].original_url, "https://example.com");
    }

    #[tokio::test]
    async fn store_and_snapshot_both_failing_fails_the_write() {
        let dir = tempfile::tempdir().unwrap();
        // The snapshot path is an existing directory, so every save fails.
        let snapshot = Arc::new(FileStore::new(dir.path()));

        let service = LinkService::new(
            Arc::new(LinkCache::new()),
            Arc::new(failing::FailingStore),
            SeqGenerator::with_prefix("sn"),
        )
        .with_snapshot(snapshot);

        let err = service.shorten("https://example.com", "").await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
    }

    #[tokio::test]
    async fn snapshot_failure_alone_does_not_fail_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Arc::new(FileStore::new(dir.path()));

        let store = Arc::new(InMemoryStore::new());
        let service = LinkService::new(
            Arc::new(LinkCache::new()),
            Arc::clone(&store),
            SeqGenerator::with_prefix("sn"),
        )
        .with_snapshot(snapshot);

        let shortened = service.shorten("https://example.com", "").await.unwrap();
        assert!(!shortened.conflict);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn batch_returns_a_code_per_correlation_id() {
        let store = Arc::new(InMemoryStore::new());
        let service = service_with(Arc::clone(&store));

        let urls = HashMap::from([
            ("a".to_owned(), "https://one.example".to_owned()),
            ("b".to_owned(), "https://two.example".to_owned()),
        ]);

        let codes = service.shorten_batch(urls, "alice").await.unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(
            service.resolve(&codes["a"]).unwrap(),
            "https://one.example"
        );
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn batch_store_failure_still_returns_codes_from_cache() {
        let service = LinkService::new(
            Arc::new(LinkCache::new()),
            Arc::new(failing::FailingStore),
            SeqGenerator::with_prefix("sn"),
        );

        let urls = HashMap::from([("a".to_owned(), "https://one.example".to_owned())]);
        let codes = service.shorten_batch(urls, "").await.unwrap();

        assert_eq!(
            service.resolve(&codes["a"]).unwrap(),
            "https://one.example"
        );
    }

    #[tokio::test]
    async fn warm_cache_loads_stored_records() {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert(&LinkRecord::new(
                ShortCode::new_unchecked("abc123"),
                "https://example.com",
                "",
            ))
            .await
            .unwrap();

        let service = service_with(Arc::clone(&store));
        let loaded = service.warm_cache().await.unwrap();

        assert_eq!(loaded, 1);
        assert_eq!(
            service.resolve(&ShortCode::new_unchecked("abc123")).unwrap(),
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn list_by_owner_returns_only_that_owner() {
        let store = Arc::new(InMemoryStore::new());
        let service = service_with(Arc::clone(&store));

        service.shorten("https://one.example", "alice").await.unwrap();
        service.shorten("https://two.example", "bob").await.unwrap();

        let records = service.list_by_owner("alice").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].original_url, "https://one.example");
    }

    mod failing {
        use async_trait::async_trait;
        use snip_core::{DeleteIntent, LinkRecord, LinkStore, Result, ShortCode, StoreError};

        /// A store whose every call fails, as if the database were down.
        pub struct FailingStore;

        #[async_trait]
        impl LinkStore for FailingStore {
            async fn insert(&self, _record: &LinkRecord) -> Result<()> {
                Err(StoreError::Unavailable("injected failure".into()))
            }

            async fn insert_batch(&self, _records: &[LinkRecord]) -> Result<()> {
                Err(StoreError::Unavailable("injected failure".into()))
            }

            async fn lookup_by_original(&self, _original_url: &str) -> Result<ShortCode> {
                Err(StoreError::Unavailable("injected failure".into()))
            }

            async fn lookup_by_owner(&self, _owner_id: &str) -> Result<Vec<LinkRecord>> {
                Err(StoreError::Unavailable("injected failure".into()))
            }

            async fn batch_tombstone(&self, _intents: &[DeleteIntent]) -> Result<()> {
                Err(StoreError::Unavailable("injected failure".into()))
            }

            async fn ping(&self) -> Result<()> {
                Err(StoreError::Unavailable("injected failure".into()))
            }

            async fn load_all(&self) -> Result<Vec<LinkRecord>> {
                Err(StoreError::Unavailable("injected failure".into()))
            }
        }
    }
}
