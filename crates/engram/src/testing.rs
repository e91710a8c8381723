//! Test utilities for engram - mock implementations for fast unit tests

use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::error::Result;

/// Mock embedder for fast unit tests that don't need real ML.
/// Produces deterministic vectors based on input text hash.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimension: usize,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Generate a deterministic "embedding" from text using hashing.
    /// Values fall in [-1, 1]; same text always yields the same vector.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        (0..self.dimension)
            .map(|i| {
                // Seed + index gives pseudo-random but deterministic values
                let x = seed
                    .wrapping_mul(i as u64 + 1)
                    .wrapping_add(0x9e3779b97f4a7c15);
                let normalized = (x as f32) / (u64::MAX as f32);
                (normalized * 2.0) - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}

/// Embedder that always fails, for exercising degraded paths.
#[derive(Debug, Clone, Default)]
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(crate::error::EngramError::Embedding(
            "embedder unavailable".to_string(),
        ))
    }
}
