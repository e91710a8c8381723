//! Engine entrypoint
//!
//! `MemoryEngine` is the multi-tenant facade: it owns one `OwnerStore` per
//! owner behind a `DashMap` of per-owner locks, drives extraction on every
//! recorded turn, assembles context on demand, and persists snapshots when
//! a snapshot store is configured. Cross-owner operations never contend;
//! within one owner, writes take the owner's write lock.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngramConfig;
use crate::context::{ContextAssembler, ContextEntry};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::extract::{ConversationTurn, MemoryExtractor};
use crate::memory::{Intensity, Memory, MemoryKind, MemoryPayload};
use crate::scoring::{self, ScoringStats};
use crate::store::{OwnerStore, SnapshotStore};

/// What `record_turn` stored for one conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub conversation_id: Uuid,
    pub emotional_state_id: Option<Uuid>,
    pub life_event_id: Option<Uuid>,
    pub topic_pattern_id: Option<Uuid>,
    pub topics: Vec<String>,
}

/// Multi-tenant memory engine.
pub struct MemoryEngine {
    config: EngramConfig,
    embedder: Arc<dyn Embedder>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    extractor: MemoryExtractor,
    assembler: ContextAssembler,
    owners: DashMap<String, Arc<RwLock<OwnerStore>>>,
}

impl MemoryEngine {
    pub fn new(config: EngramConfig, embedder: Arc<dyn Embedder>) -> Self {
        let config = config.sanitized();
        let extractor = MemoryExtractor::new(config.retention.life_event_dedup_hours);
        let assembler = ContextAssembler::new(config.scoring.clone(), config.context.clone());
        info!("Memory engine initialized");
        Self {
            config,
            embedder,
            snapshots: None,
            extractor,
            assembler,
            owners: DashMap::new(),
        }
    }

    /// Attach a snapshot backend. Owner state is loaded on first access and
    /// saved after every mutating operation.
    pub fn with_snapshot_store(mut self, snapshots: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Fetch or lazily load the store for an owner.
    async fn owner_store(&self, owner_id: &str) -> Result<Arc<RwLock<OwnerStore>>> {
        if let Some(existing) = self.owners.get(owner_id) {
            return Ok(existing.clone());
        }

        let store = match &self.snapshots {
            Some(snapshots) => match snapshots.load(owner_id).await? {
                Some(snapshot) => {
                    info!(owner_id, "Restored owner from snapshot");
                    OwnerStore::from_snapshot(snapshot, self.config.retention.clone())
                }
                None => OwnerStore::new(owner_id, self.config.retention.clone()),
            },
            None => OwnerStore::new(owner_id, self.config.retention.clone()),
        };

        // Two tasks may race to load the same owner; the first insert wins
        // and both see the same store afterwards.
        let arc = Arc::new(RwLock::new(store));
        Ok(self
            .owners
            .entry(owner_id.to_string())
            .or_insert(arc)
            .clone())
    }

    /// Save a snapshot if a backend is configured. Persistence failures are
    /// logged, never fatal to the calling operation.
    async fn persist(&self, store: &OwnerStore) {
        if let Some(snapshots) = &self.snapshots {
            if let Err(e) = snapshots.save(&store.snapshot()).await {
                warn!(owner_id = %store.owner_id(), error = %e, "Snapshot save failed");
            }
        }
    }

    /// Insert a memory for an owner. A missing embedding is filled in from
    /// the payload text when the embedder cooperates; on embedder failure
    /// the memory is stored unembedded and its semantic signal degrades to
    /// zero.
    pub async fn insert_memory(&self, owner_id: &str, mut memory: Memory) -> Result<Uuid> {
        if memory.embedding.is_none() {
            match self.embedder.embed(&embedding_text(&memory.payload)).await {
                Ok(embedding) => memory.embedding = Some(embedding),
                Err(e) => warn!(owner_id, error = %e, "Embedding failed; storing unembedded"),
            }
        }

        let store = self.owner_store(owner_id).await?;
        let mut guard = store.write().await;
        let id = guard.insert(memory);
        self.persist(&guard).await;
        Ok(id)
    }

    /// Delete a memory by id. Returns whether anything was removed.
    pub async fn delete_memory(&self, owner_id: &str, id: Uuid) -> Result<bool> {
        let store = self.owner_store(owner_id).await?;
        let mut guard = store.write().await;
        let removed = guard.delete(id);
        if removed {
            self.persist(&guard).await;
        }
        Ok(removed)
    }

    /// All of an owner's memories of one kind, in storage order.
    pub async fn memories_of_kind(
        &self,
        owner_id: &str,
        kind: MemoryKind,
    ) -> Result<Vec<Memory>> {
        let store = self.owner_store(owner_id).await?;
        let guard = store.read().await;
        Ok(guard.memories_of_kind(kind).into_iter().cloned().collect())
    }

    /// Record a conversation turn: store its digest as a Conversation
    /// memory and run extraction, storing whatever secondary records the
    /// turn yields.
    pub async fn record_turn(&self, turn: &ConversationTurn) -> Result<RecordOutcome> {
        let store = self.owner_store(&turn.owner_id).await?;
        let mut guard = store.write().await;

        let extracted = self.extractor.extract(turn, &guard.life_event_history());

        let digest = format!(
            "user: {}; assistant: {}",
            turn.user_message.trim(),
            turn.assistant_message.trim()
        );
        let mut conversation = Memory::new(
            turn.owner_id.clone(),
            MemoryKind::Conversation,
            MemoryPayload::Conversation {
                summary: digest.clone(),
                topics: extracted.topics.clone(),
            },
        );
        if let Some(reading) = &extracted.emotional_state {
            conversation = conversation.with_emotion_score(reading.primary.polarity());
        }
        match self.embedder.embed(&digest).await {
            Ok(embedding) => conversation.embedding = Some(embedding),
            Err(e) => {
                warn!(owner_id = %turn.owner_id, error = %e, "Embedding failed; storing unembedded")
            }
        }
        let conversation_id = guard.insert(conversation);

        let emotional_state_id = extracted.emotional_state.as_ref().map(|reading| {
            let memory = Memory::new(
                turn.owner_id.clone(),
                MemoryKind::EmotionalState,
                MemoryPayload::EmotionalState {
                    primary: reading.primary,
                    secondary: reading.secondary.clone(),
                    intensity: reading.intensity,
                },
            )
            .with_salience(intensity_salience(reading.intensity))
            .with_emotion_score(reading.primary.polarity());
            guard.insert(memory)
        });

        let life_event_id = extracted.life_event.as_ref().map(|candidate| {
            let memory = Memory::new(
                turn.owner_id.clone(),
                MemoryKind::LifeEvent,
                MemoryPayload::LifeEvent {
                    category: candidate.category,
                    description: candidate.description.clone(),
                    importance: candidate.importance,
                },
            )
            .with_salience(intensity_salience(candidate.importance));
            guard.insert(memory)
        });

        let topic_pattern_id = if extracted.topics.is_empty() {
            None
        } else {
            let dominant = extracted
                .emotional_state
                .as_ref()
                .map(|r| r.primary)
                .unwrap_or(crate::memory::EmotionCategory::Neutral);
            Some(guard.merge_topic_pattern(&extracted.topics, dominant, conversation_id))
        };

        self.persist(&guard).await;
        debug!(
            owner_id = %turn.owner_id,
            conversation_id = %conversation_id,
            topics = extracted.topics.len(),
            "Recorded turn"
        );

        Ok(RecordOutcome {
            conversation_id,
            emotional_state_id,
            life_event_id,
            topic_pattern_id,
            topics: extracted.topics,
        })
    }

    /// Upsert a named relationship in the owner's profile.
    pub async fn set_relationship(
        &self,
        owner_id: &str,
        name: impl Into<String>,
        relation: impl Into<String>,
    ) -> Result<()> {
        let store = self.owner_store(owner_id).await?;
        let mut guard = store.write().await;
        guard.set_relationship(name, relation);
        self.persist(&guard).await;
        Ok(())
    }

    /// Add an active goal to the owner's profile.
    pub async fn add_goal(&self, owner_id: &str, description: impl Into<String>) -> Result<()> {
        let store = self.owner_store(owner_id).await?;
        let mut guard = store.write().await;
        guard.add_goal(description);
        self.persist(&guard).await;
        Ok(())
    }

    /// Deactivate a goal by description. Returns whether one was found.
    pub async fn complete_goal(&self, owner_id: &str, description: &str) -> Result<bool> {
        let store = self.owner_store(owner_id).await?;
        let mut guard = store.write().await;
        let completed = guard.complete_goal(description);
        if completed {
            self.persist(&guard).await;
        }
        Ok(completed)
    }

    /// Add an interest to the owner's profile; duplicates are ignored.
    pub async fn add_interest(&self, owner_id: &str, interest: impl Into<String>) -> Result<()> {
        let store = self.owner_store(owner_id).await?;
        let mut guard = store.write().await;
        guard.add_interest(interest);
        self.persist(&guard).await;
        Ok(())
    }

    /// Build the ordered context for a query. Takes the owner's write lock
    /// because emitted conversations have their access stats updated.
    ///
    /// A caller that already holds an embedding for `query_text` can pass
    /// it; otherwise the engine embeds the text itself, degrading to a
    /// query-less ranking when the embedder fails.
    pub async fn build_context(
        &self,
        owner_id: &str,
        query_text: &str,
        query_embedding: Option<Vec<f32>>,
        max_items: usize,
    ) -> Result<Vec<ContextEntry>> {
        let query_embedding = match query_embedding {
            Some(embedding) => Some(embedding),
            None => match self.embedder.embed(query_text).await {
                Ok(embedding) => Some(embedding),
                Err(e) => {
                    warn!(owner_id, error = %e, "Query embedding failed; ranking without it");
                    None
                }
            },
        };

        let store = self.owner_store(owner_id).await?;
        let mut guard = store.write().await;
        let entries = self.assembler.assemble(
            &mut guard,
            query_text,
            query_embedding.as_deref(),
            max_items,
        );
        self.persist(&guard).await;
        Ok(entries)
    }

    /// Score distribution over an owner's memories, optionally against a
    /// query. An embedder failure drops the semantic signal rather than
    /// failing the diagnostic.
    pub async fn scoring_stats(
        &self,
        owner_id: &str,
        query_text: Option<&str>,
    ) -> Result<ScoringStats> {
        let query_embedding = match query_text {
            Some(text) => match self.embedder.embed(text).await {
                Ok(embedding) => Some(embedding),
                Err(e) => {
                    warn!(owner_id, error = %e, "Query embedding failed; stats without it");
                    None
                }
            },
            None => None,
        };

        let store = self.owner_store(owner_id).await?;
        let guard = store.read().await;
        let memories: Vec<Memory> = guard.all_memories().cloned().collect();
        Ok(scoring::scoring_stats(
            query_embedding.as_deref(),
            &memories,
            &self.config.scoring,
        ))
    }
}

fn intensity_salience(intensity: Intensity) -> f32 {
    match intensity {
        Intensity::High => 0.9,
        Intensity::Medium => 0.6,
        Intensity::Low => 0.3,
    }
}

/// Text fed to the embedder when a memory arrives without an embedding.
fn embedding_text(payload: &MemoryPayload) -> String {
    match payload {
        MemoryPayload::Conversation { summary, .. } => summary.clone(),
        MemoryPayload::Fact { text } => text.clone(),
        MemoryPayload::Preference { key, value } => format!("{key}: {value}"),
        MemoryPayload::LifeEvent { description, .. } => description.clone(),
        MemoryPayload::EmotionalState { primary, .. } => {
            format!("feeling {}", primary.label())
        }
        MemoryPayload::TopicPattern { topics, .. } => topics.join(", "),
        MemoryPayload::LongTerm { text } => text.clone(),
    }
}
