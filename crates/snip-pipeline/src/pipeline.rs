use crate::error::PipelineError;
use async_trait::async_trait;
use snip_core::{DeleteIntent, LinkStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

/// Upper bound on a single tombstone flush. The flush is decoupled from
/// any caller's request lifetime, so this is the only thing limiting how
/// long the consumer can be held up by a slow store.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// The one store capability the pipeline needs.
///
/// Every [`LinkStore`] provides it through the blanket impl below; tests
/// implement it directly to observe flushes.
#[async_trait]
pub trait TombstoneStore: Send + Sync + 'static {
    async fn batch_tombstone(&self, intents: &[DeleteIntent]) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: LinkStore> TombstoneStore for S {
    async fn batch_tombstone(&self, intents: &[DeleteIntent]) -> Result<(), StoreError> {
        LinkStore::batch_tombstone(self, intents).await
    }
}

/// Tuning knobs for the deletion pipeline.
#[derive(Debug, Clone, TypedBuilder)]
pub struct PipelineSettings {
    /// Flush as soon as the buffer holds this many intents.
    #[builder(default = 100)]
    pub flush_size: usize,
    /// Flush any buffered intents at least this often.
    #[builder(default = Duration::from_secs(10))]
    pub flush_interval: Duration,
    /// Capacity of each producer channel and of the merge channel. A
    /// full channel blocks the producer's send; that is the only
    /// backpressure mechanism.
    #[builder(default = 1000)]
    pub channel_capacity: usize,
    /// How long `stop` waits for the final drain before abandoning it.
    #[builder(default = Duration::from_secs(10))]
    pub stop_timeout: Duration,
}

/// A handle for enqueuing delete intents onto one pipeline input channel.
///
/// Cheap to clone; clones share the same channel (and its FIFO order).
#[derive(Debug, Clone)]
pub struct DeleteProducer {
    tx: mpsc::Sender<DeleteIntent>,
}

impl DeleteProducer {
    /// Enqueues one intent. Waits when the channel is full. The intent
    /// is fire-and-forget from here: the caller gets no delivery receipt
    /// and the flush is not awaited.
    pub async fn enqueue(&self, intent: DeleteIntent) -> Result<(), PipelineError> {
        self.tx
            .send(intent)
            .await
            .map_err(|_| PipelineError::Stopped)
    }
}

/// Fan-in batched deletion pipeline: N producer channels merge into one
/// consumer that owns the flush buffer.
///
/// Lifecycle is Running, then Draining once cancellation is signalled,
/// then Stopped after the final flush. Producers are registered before
/// [`start`]; `start` consumes the pipeline, so late registration is
/// impossible by construction.
///
/// The buffer belongs to the single consumer task alone, so it needs no
/// lock.
///
/// [`start`]: DeletePipeline::start
#[derive(Debug)]
pub struct DeletePipeline<S> {
    settings: PipelineSettings,
    store: Arc<S>,
    inputs: Vec<mpsc::Receiver<DeleteIntent>>,
}

impl<S: TombstoneStore> DeletePipeline<S> {
    pub fn new(store: Arc<S>, settings: PipelineSettings) -> Self {
        Self {
            settings,
            store,
            inputs: Vec::new(),
        }
    }

    /// Opens a new bounded input channel and returns its producer handle.
    pub fn register_producer(&mut self) -> DeleteProducer {
        let (tx, rx) = mpsc::channel(self.settings.channel_capacity.max(1));
        self.inputs.push(rx);
        DeleteProducer { tx }
    }

    /// Spawns one forwarder task per registered input channel plus the
    /// consumer task, and returns the handle used to stop them.
    pub fn start(self) -> PipelineHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (merge_tx, merge_rx) = mpsc::channel(self.settings.channel_capacity.max(1));

        let producer_count = self.inputs.len();
        for rx in self.inputs {
            tokio::spawn(forward(rx, merge_tx.clone(), cancel_rx.clone()));
        }
        // The consumer learns that every forwarder is gone from the merge
        // channel closing, so the spawn loop's original sender must not
        // outlive them.
        drop(merge_tx);

        let consumer = tokio::spawn(consume(
            merge_rx,
            Arc::clone(&self.store),
            self.settings.clone(),
            cancel_rx,
        ));

        info!(
            producers = producer_count,
            flush_size = self.settings.flush_size,
            flush_interval_ms = self.settings.flush_interval.as_millis() as u64,
            "delete pipeline started"
        );

        PipelineHandle {
            cancel: cancel_tx,
            consumer,
            stop_timeout: self.settings.stop_timeout,
        }
    }
}

/// Handle to a running pipeline.
///
/// Dropping the handle without calling [`stop`] also cancels the tasks
/// (the watch sender closes); they drain detached in that case.
///
/// [`stop`]: PipelineHandle::stop
#[derive(Debug)]
pub struct PipelineHandle {
    cancel: watch::Sender<bool>,
    consumer: JoinHandle<()>,
    stop_timeout: Duration,
}

impl PipelineHandle {
    /// Signals cancellation and waits for the consumer's final flush.
    ///
    /// The wait is bounded by the configured stop timeout; the pipeline
    /// must be safe to abandon mid-flight, and the final flush itself is
    /// already bounded by the flush timeout.
    pub async fn stop(self) {
        info!("stopping delete pipeline");
        let _ = self.cancel.send(true);

        match tokio::time::timeout(self.stop_timeout, self.consumer).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(error = %err, "delete pipeline consumer failed"),
            Err(_) => warn!("delete pipeline did not drain before the stop deadline"),
        }
    }
}

/// Forwards one input channel into the merge channel, preserving the
/// producer's FIFO order.
async fn forward(
    mut rx: mpsc::Receiver<DeleteIntent>,
    tx: mpsc::Sender<DeleteIntent>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = cancel.changed() => break,
            item = rx.recv() => match item {
                // All producer handles dropped; nothing left to forward.
                None => return,
                Some(intent) => {
                    if tx.send(intent).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    // Cancelled: hand over whatever producers already enqueued, then
    // exit. Anything sent after this point is rejected as Stopped.
    while let Ok(intent) = rx.try_recv() {
        if tx.send(intent).await.is_err() {
            return;
        }
    }
}

/// The single consumer: owns the buffer, flushes by size, by interval,
/// and once more on shutdown.
async fn consume<S: TombstoneStore>(
    mut input: mpsc::Receiver<DeleteIntent>,
    store: Arc<S>,
    settings: PipelineSettings,
    mut cancel: watch::Receiver<bool>,
) {
    let mut buffer: Vec<DeleteIntent> = Vec::with_capacity(settings.flush_size);
    let mut ticker = tokio::time::interval(settings.flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // An interval's first tick completes immediately; consume it so the
    // timer measures from pipeline start.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.changed() => {
                debug!(buffered = buffer.len(), "delete pipeline draining");
                break;
            }
            _ = ticker.tick() => {
                if !buffer.is_empty() {
                    flush(store.as_ref(), &mut buffer).await;
                }
            }
            item = input.recv() => match item {
                None => {
                    // Every producer and forwarder is gone.
                    if !buffer.is_empty() {
                        flush(store.as_ref(), &mut buffer).await;
                    }
                    info!("delete pipeline stopped");
                    return;
                }
                Some(intent) => {
                    buffer.push(intent);
                    if buffer.len() >= settings.flush_size {
                        flush(store.as_ref(), &mut buffer).await;
                    }
                }
            }
        }
    }

    // Draining: the forwarders saw the same cancellation and hand over
    // what producers already enqueued before closing the merge channel.
    while let Some(intent) = input.recv().await {
        buffer.push(intent);
        if buffer.len() >= settings.flush_size {
            flush(store.as_ref(), &mut buffer).await;
        }
    }
    if !buffer.is_empty() {
        flush(store.as_ref(), &mut buffer).await;
    }
    info!("delete pipeline stopped");
}

/// One batch tombstone call under the flush timeout. Failed or timed-out
/// batches are logged and discarded: at-most-once, no retry, no
/// dead-letter.
async fn flush<S: TombstoneStore>(store: &S, buffer: &mut Vec<DeleteIntent>) {
    let batch = std::mem::take(buffer);

    match tokio::time::timeout(FLUSH_TIMEOUT, store.batch_tombstone(&batch)).await {
        Ok(Ok(())) => info!(count = batch.len(), "flushed tombstone batch"),
        Ok(Err(err)) => {
            error!(error = %err, count = batch.len(), "failed to flush tombstone batch");
        }
        Err(_) => error!(count = batch.len(), "tombstone flush timed out"),
    }
}
