//! Embedding generation.
//!
//! The [`EmbeddingProvider`] trait is the seam between the retrieval pipeline
//! and whichever vendor produces the vectors. Production uses
//! [`OpenAiEmbeddings`]; tests substitute the deterministic
//! [`MockEmbeddingProvider`].

pub mod openai;

use async_trait::async_trait;

use crate::types::ServiceError;

pub use openai::OpenAiEmbeddings;

/// Maps text to a fixed-length numeric vector.
///
/// Each call is independent: no caching, batching, or retries. Determinism is
/// only as strong as the underlying model's.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text. Fails with [`ServiceError::Upstream`] on any
    /// transport or vendor error.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// Identifier of the embedding model, for logging.
    fn model_id(&self) -> &str;
}

/// Deterministic hash-seeded embedding provider for tests.
///
/// Identical inputs always produce identical unit-length vectors, and
/// distinct inputs are overwhelmingly likely to differ, which is enough to
/// exercise similarity search without a network.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 64 }
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        // FNV-1a over the input seeds a xorshift generator per dimension.
        let mut seed: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.bytes() {
            seed ^= u64::from(byte);
            seed = seed.wrapping_mul(0x0000_0100_0000_01b3);
        }
        seed |= 1;

        let mut state = seed;
        let mut vector: Vec<f32> = (0..self.dimensions)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                // Map to [-1, 1).
                (state as f64 / u64::MAX as f64) as f32 * 2.0 - 1.0
            })
            .collect();

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }

    fn model_id(&self) -> &str {
        "mock-embedding"
    }
}
