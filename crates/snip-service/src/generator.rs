use rand::RngCore;
use snip_core::ShortCode;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// Generated codes are treated as collision-free; there is no uniqueness
/// retry loop, and the store's constraints are the only guard.
pub trait Generator: Send + Sync + 'static {
    /// Generates a new short code.
    fn generate(&self) -> ShortCode;
}

/// Random short codes: 48 bits of entropy, base58-encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGenerator;

impl RandomGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> ShortCode {
        let mut bytes = [0u8; 6];
        rand::thread_rng().fill_bytes(&mut bytes);
        ShortCode::new_unchecked(bs58::encode(bytes).into_string())
    }
}

/// Deterministic prefix-plus-counter codes for tests.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl SeqGenerator {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            prefix: prefix.into(),
        }
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> ShortCode {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        ShortCode::new_unchecked(format!("{}{:06}", self.prefix, count))
    }
}
