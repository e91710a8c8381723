//! Memory types and operations
//!
//! Defines the core memory structures shared by the index, the scoring
//! engine, the extractor, and the context assembler.

pub mod types;

pub use types::{
    EmotionCategory, Intensity, LifeEventCategory, Memory, MemoryKind, MemoryPayload,
};
