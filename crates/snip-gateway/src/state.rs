use snip_core::{DeleteIntent, ShortCode};
use snip_pipeline::{DeleteProducer, PipelineError};
use snip_service::{LinkService, RandomGenerator};
use snip_storage::AnyStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub type Service = LinkService<AnyStore, RandomGenerator>;

#[derive(Clone)]
pub struct AppState {
    service: Arc<Service>,
    producers: Arc<Vec<DeleteProducer>>,
    next_producer: Arc<AtomicUsize>,
    base_url: String,
}

impl AppState {
    /// `producers` must be non-empty: the state is the only route from
    /// handlers into the deletion pipeline.
    pub fn new(
        service: Arc<Service>,
        producers: Vec<DeleteProducer>,
        base_url: impl Into<String>,
    ) -> Self {
        assert!(!producers.is_empty(), "at least one delete producer is required");
        Self {
            service,
            producers: Arc::new(producers),
            next_producer: Arc::new(AtomicUsize::new(0)),
            base_url: base_url.into(),
        }
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Spreads delete intents round-robin across the pipeline's input
    /// channels. The send is fire-and-forget past this point; nothing
    /// waits for the flush.
    pub async fn enqueue_delete(
        &self,
        owner_id: &str,
        code: ShortCode,
    ) -> std::result::Result<(), PipelineError> {
        let index = self.next_producer.fetch_add(1, Ordering::Relaxed) % self.producers.len();
        self.producers[index]
            .enqueue(DeleteIntent::new(owner_id, code))
            .await
    }
}
