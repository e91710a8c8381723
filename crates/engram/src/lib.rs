//! Engram - Memory relevance scoring and context retrieval for
//! conversational agents
//!
//! This crate maintains per-owner memory stores with vector search,
//! multi-signal relevance scoring, keyword-based memory extraction, and
//! ordered context assembly.

pub mod config;
pub mod context;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod extract;
pub mod index;
pub mod memory;
pub mod scoring;
pub mod store;
pub mod testing;

pub use config::EngramConfig;
pub use context::{ContextEntry, ContextSource};
pub use embedding::Embedder;
pub use engine::{MemoryEngine, RecordOutcome};
pub use error::EngramError;
pub use extract::ConversationTurn;
pub use memory::{Memory, MemoryKind, MemoryPayload};
pub use store::{JsonSnapshotStore, SnapshotStore};
