//! Embedding abstraction
//!
//! The engine never embeds text itself; callers plug in whatever model they
//! run behind this trait. `testing::MockEmbedder` provides a deterministic
//! implementation for tests.

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into a fixed-dimension embedding vector.
///
/// Implementations must return vectors of a consistent dimension; the
/// per-owner index fixes its dimension from the first vector it sees.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
