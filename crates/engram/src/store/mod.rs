//! Per-owner memory store
//!
//! Owns every collection scoped to one owner: the bounded Conversation and
//! EmotionalState queues, life events, deduplicated topic patterns, facts,
//! preferences, long-term notes, the profile categories the assembler merges
//! in, and the owner's vector index. All mutation goes through this type so
//! caps and dedup invariants hold on every write path.

pub mod snapshot;

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::RetentionConfig;
use crate::index::{IndexMetadata, VectorIndex};
use crate::memory::{EmotionCategory, LifeEventCategory, Memory, MemoryKind, MemoryPayload};

pub use snapshot::{JsonSnapshotStore, SnapshotStore, StoreSnapshot};

use serde::{Deserialize, Serialize};

/// A named relationship in the owner's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    pub relation: String,
}

/// A goal in the owner's profile. Only active goals are surfaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub description: String,
    pub active: bool,
}

/// All memory and profile state for a single owner.
pub struct OwnerStore {
    owner_id: String,
    retention: RetentionConfig,
    conversations: VecDeque<Memory>,
    emotional_states: VecDeque<Memory>,
    life_events: Vec<Memory>,
    topic_patterns: Vec<Memory>,
    facts: Vec<Memory>,
    preferences: Vec<Memory>,
    long_term: Vec<Memory>,
    relationships: Vec<Relationship>,
    goals: Vec<Goal>,
    interests: Vec<String>,
    index: VectorIndex,
}

impl OwnerStore {
    pub fn new(owner_id: impl Into<String>, retention: RetentionConfig) -> Self {
        Self {
            owner_id: owner_id.into(),
            retention,
            conversations: VecDeque::new(),
            emotional_states: VecDeque::new(),
            life_events: Vec::new(),
            topic_patterns: Vec::new(),
            facts: Vec::new(),
            preferences: Vec::new(),
            long_term: Vec::new(),
            relationships: Vec::new(),
            goals: Vec::new(),
            interests: Vec::new(),
            index: VectorIndex::new(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Insert a memory, routing it by kind, enforcing caps, and indexing
    /// its embedding.
    ///
    /// Bounded fields are clamped on write, never rejected. An embedding
    /// whose dimension does not match the owner's index is logged and left
    /// unindexed; the memory is still stored and its semantic signal
    /// degrades to zero.
    pub fn insert(&mut self, mut memory: Memory) -> Uuid {
        memory.owner_id = self.owner_id.clone();
        memory.clamp_bounds();
        let id = memory.id;

        if let Some(ref embedding) = memory.embedding {
            let meta = IndexMetadata {
                owner_id: memory.owner_id.clone(),
                kind: memory.kind,
                created_at: memory.created_at,
            };
            if let Err(e) = self.index.insert(id, embedding.clone(), meta) {
                warn!(
                    owner_id = %self.owner_id,
                    memory_id = %id,
                    error = %e,
                    "Embedding left unindexed"
                );
            }
        }

        match memory.kind {
            MemoryKind::Conversation => {
                self.conversations.push_back(memory);
                while self.conversations.len() > self.retention.max_conversations {
                    if let Some(evicted) = self.conversations.pop_front() {
                        self.index.delete(evicted.id);
                        debug!(
                            owner_id = %self.owner_id,
                            memory_id = %evicted.id,
                            "Evicted oldest conversation"
                        );
                    }
                }
            }
            MemoryKind::EmotionalState => {
                self.emotional_states.push_back(memory);
                while self.emotional_states.len() > self.retention.max_emotional_states {
                    if let Some(evicted) = self.emotional_states.pop_front() {
                        self.index.delete(evicted.id);
                    }
                }
            }
            MemoryKind::LifeEvent => self.life_events.push(memory),
            MemoryKind::TopicPattern => self.topic_patterns.push(memory),
            MemoryKind::Fact => self.facts.push(memory),
            MemoryKind::Preference => self.preferences.push(memory),
            MemoryKind::LongTerm => self.long_term.push(memory),
        }

        id
    }

    /// Delete a memory by id across every collection. Returns whether
    /// anything was removed; absent ids are a no-op.
    pub fn delete(&mut self, id: Uuid) -> bool {
        self.index.delete(id);

        let conv_before = self.conversations.len();
        self.conversations.retain(|m| m.id != id);
        let emo_before = self.emotional_states.len();
        self.emotional_states.retain(|m| m.id != id);

        let mut removed =
            conv_before != self.conversations.len() || emo_before != self.emotional_states.len();

        for collection in [
            &mut self.life_events,
            &mut self.topic_patterns,
            &mut self.facts,
            &mut self.preferences,
            &mut self.long_term,
        ] {
            let before = collection.len();
            collection.retain(|m| m.id != id);
            removed |= before != collection.len();
        }

        removed
    }

    /// All memories of one kind, in storage order.
    pub fn memories_of_kind(&self, kind: MemoryKind) -> Vec<&Memory> {
        match kind {
            MemoryKind::Conversation => self.conversations.iter().collect(),
            MemoryKind::EmotionalState => self.emotional_states.iter().collect(),
            MemoryKind::LifeEvent => self.life_events.iter().collect(),
            MemoryKind::TopicPattern => self.topic_patterns.iter().collect(),
            MemoryKind::Fact => self.facts.iter().collect(),
            MemoryKind::Preference => self.preferences.iter().collect(),
            MemoryKind::LongTerm => self.long_term.iter().collect(),
        }
    }

    /// Every memory in the store, across all kinds.
    pub fn all_memories(&self) -> impl Iterator<Item = &Memory> {
        self.conversations
            .iter()
            .chain(self.emotional_states.iter())
            .chain(self.life_events.iter())
            .chain(self.topic_patterns.iter())
            .chain(self.facts.iter())
            .chain(self.preferences.iter())
            .chain(self.long_term.iter())
    }

    pub fn conversations(&self) -> &VecDeque<Memory> {
        &self.conversations
    }

    pub fn emotional_states(&self) -> &VecDeque<Memory> {
        &self.emotional_states
    }

    pub fn life_events(&self) -> &[Memory] {
        &self.life_events
    }

    pub fn topic_patterns(&self) -> &[Memory] {
        &self.topic_patterns
    }

    pub fn facts(&self) -> &[Memory] {
        &self.facts
    }

    pub fn preferences(&self) -> &[Memory] {
        &self.preferences
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn interests(&self) -> &[String] {
        &self.interests
    }

    /// Life-event history as `(category, created_at)` pairs, the read-only
    /// view the extractor needs for its dedup decision.
    pub fn life_event_history(&self) -> Vec<(LifeEventCategory, DateTime<Utc>)> {
        self.life_events
            .iter()
            .filter_map(|m| match &m.payload {
                MemoryPayload::LifeEvent { category, .. } => Some((*category, m.created_at)),
                _ => None,
            })
            .collect()
    }

    /// Mark a conversation memory as surfaced. Returns false when the id is
    /// not a stored conversation.
    pub fn mark_conversation_accessed(&mut self, id: Uuid) -> bool {
        if let Some(memory) = self.conversations.iter_mut().find(|m| m.id == id) {
            memory.mark_accessed();
            true
        } else {
            false
        }
    }

    /// Merge a turn's topic set into the owner's TopicPattern records.
    ///
    /// A pattern sharing any topic with the turn *and* carrying the same
    /// dominant emotion absorbs the turn: frequency is summed, unseen topics
    /// and the conversation id are appended. Otherwise a new pattern record
    /// is created with frequency 1.
    pub fn merge_topic_pattern(
        &mut self,
        topics: &[String],
        dominant_emotion: EmotionCategory,
        conversation_id: Uuid,
    ) -> Uuid {
        if topics.is_empty() {
            // Nothing to merge; callers should not reach here
            return conversation_id;
        }

        let existing = self.topic_patterns.iter_mut().find(|m| {
            matches!(
                &m.payload,
                MemoryPayload::TopicPattern {
                    topics: stored,
                    dominant_emotion: emotion,
                    ..
                } if *emotion == dominant_emotion && stored.iter().any(|t| topics.contains(t))
            )
        });

        if let Some(pattern) = existing {
            let id = pattern.id;
            if let MemoryPayload::TopicPattern {
                topics: stored,
                frequency,
                related_conversations,
                ..
            } = &mut pattern.payload
            {
                *frequency += 1;
                for topic in topics {
                    if !stored.contains(topic) {
                        stored.push(topic.clone());
                    }
                }
                related_conversations.push(conversation_id);
            }
            debug!(owner_id = %self.owner_id, pattern_id = %id, "Merged topic pattern");
            id
        } else {
            let memory = Memory::new(
                self.owner_id.clone(),
                MemoryKind::TopicPattern,
                MemoryPayload::TopicPattern {
                    topics: topics.to_vec(),
                    dominant_emotion,
                    frequency: 1,
                    related_conversations: vec![conversation_id],
                },
            )
            .with_emotion_score(dominant_emotion.polarity());
            self.insert(memory)
        }
    }

    /// Upsert a relationship by name.
    pub fn set_relationship(&mut self, name: impl Into<String>, relation: impl Into<String>) {
        let name = name.into();
        let relation = relation.into();
        if let Some(existing) = self.relationships.iter_mut().find(|r| r.name == name) {
            existing.relation = relation;
        } else {
            self.relationships.push(Relationship { name, relation });
        }
    }

    /// Add an active goal; duplicates by description are ignored.
    pub fn add_goal(&mut self, description: impl Into<String>) {
        let description = description.into();
        if !self.goals.iter().any(|g| g.description == description) {
            self.goals.push(Goal {
                description,
                active: true,
            });
        }
    }

    /// Deactivate a goal by description. Returns whether one was found.
    pub fn complete_goal(&mut self, description: &str) -> bool {
        if let Some(goal) = self
            .goals
            .iter_mut()
            .find(|g| g.description == description && g.active)
        {
            goal.active = false;
            true
        } else {
            false
        }
    }

    /// Add an interest; duplicates are ignored.
    pub fn add_interest(&mut self, interest: impl Into<String>) {
        let interest = interest.into();
        if !self.interests.contains(&interest) {
            self.interests.push(interest);
        }
    }

    /// Serialize the full store state for persistence.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            owner_id: self.owner_id.clone(),
            memories: self.all_memories().cloned().collect(),
            relationships: self.relationships.clone(),
            goals: self.goals.clone(),
            interests: self.interests.clone(),
        }
    }

    /// Rebuild a store from a snapshot, re-routing memories by kind and
    /// re-indexing embeddings. Caps are re-applied, so a snapshot written
    /// under a larger cap shrinks to the current one.
    pub fn from_snapshot(snapshot: StoreSnapshot, retention: RetentionConfig) -> Self {
        let mut store = Self::new(snapshot.owner_id, retention);
        for memory in snapshot.memories {
            store.insert(memory);
        }
        store.relationships = snapshot.relationships;
        store.goals = snapshot.goals;
        store.interests = snapshot.interests;
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> OwnerStore {
        OwnerStore::new("u1", RetentionConfig::default())
    }

    fn conversation(summary: &str) -> Memory {
        Memory::new(
            "u1",
            MemoryKind::Conversation,
            MemoryPayload::Conversation {
                summary: summary.to_string(),
                topics: vec![],
            },
        )
    }

    #[test]
    fn test_insert_routes_by_kind() {
        let mut store = store();
        store.insert(conversation("hello"));
        store.insert(Memory::new(
            "u1",
            MemoryKind::Fact,
            MemoryPayload::Fact {
                text: "likes tea".to_string(),
            },
        ));

        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.facts().len(), 1);
        assert_eq!(store.memories_of_kind(MemoryKind::Fact).len(), 1);
    }

    #[test]
    fn test_conversation_cap_evicts_oldest_first() {
        let retention = RetentionConfig {
            max_conversations: 3,
            ..RetentionConfig::default()
        };
        let mut store = OwnerStore::new("u1", retention);

        let first = store.insert(conversation("first"));
        for i in 1..4 {
            store.insert(conversation(&format!("conv {i}")));
        }

        assert_eq!(store.conversations().len(), 3);
        assert!(
            !store.conversations().iter().any(|m| m.id == first),
            "oldest conversation should be evicted"
        );
        assert!(matches!(
            &store.conversations()[0].payload,
            MemoryPayload::Conversation { summary, .. } if summary == "conv 1"
        ));
    }

    #[test]
    fn test_emotional_state_cap() {
        let retention = RetentionConfig {
            max_emotional_states: 2,
            ..RetentionConfig::default()
        };
        let mut store = OwnerStore::new("u1", retention);

        for _ in 0..5 {
            store.insert(Memory::new(
                "u1",
                MemoryKind::EmotionalState,
                MemoryPayload::EmotionalState {
                    primary: EmotionCategory::Happy,
                    secondary: vec![],
                    intensity: crate::memory::Intensity::Medium,
                },
            ));
        }

        assert_eq!(store.emotional_states().len(), 2);
    }

    #[test]
    fn test_eviction_also_removes_from_index() {
        let retention = RetentionConfig {
            max_conversations: 1,
            ..RetentionConfig::default()
        };
        let mut store = OwnerStore::new("u1", retention);

        store.insert(conversation("first").with_embedding(vec![1.0, 0.0]));
        store.insert(conversation("second").with_embedding(vec![0.0, 1.0]));

        assert_eq!(store.index().len(), 1);
    }

    #[test]
    fn test_delete_removes_everywhere() {
        let mut store = store();
        let id = store.insert(conversation("hello").with_embedding(vec![1.0, 0.0]));

        assert!(store.delete(id));
        assert!(store.conversations().is_empty());
        assert!(store.index().is_empty());
        assert!(!store.delete(id), "second delete is a no-op");
    }

    #[test]
    fn test_mismatched_embedding_stored_unindexed() {
        let mut store = store();
        store.insert(conversation("a").with_embedding(vec![1.0, 0.0]));
        store.insert(conversation("b").with_embedding(vec![1.0, 0.0, 0.0]));

        assert_eq!(store.conversations().len(), 2, "memory still stored");
        assert_eq!(store.index().len(), 1, "mismatch left unindexed");
    }

    #[test]
    fn test_topic_pattern_merge_same_topic_and_emotion() {
        let mut store = store();
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();

        store.merge_topic_pattern(
            &["work".to_string()],
            EmotionCategory::Anxious,
            c1,
        );
        store.merge_topic_pattern(
            &["work".to_string(), "health".to_string()],
            EmotionCategory::Anxious,
            c2,
        );

        assert_eq!(store.topic_patterns().len(), 1, "patterns should merge");
        match &store.topic_patterns()[0].payload {
            MemoryPayload::TopicPattern {
                topics,
                frequency,
                related_conversations,
                ..
            } => {
                assert_eq!(*frequency, 2);
                assert_eq!(related_conversations, &vec![c1, c2]);
                assert!(topics.contains(&"health".to_string()), "topics are unioned");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_topic_pattern_no_merge_on_different_emotion() {
        let mut store = store();

        store.merge_topic_pattern(&["work".to_string()], EmotionCategory::Anxious, Uuid::new_v4());
        store.merge_topic_pattern(&["work".to_string()], EmotionCategory::Happy, Uuid::new_v4());

        assert_eq!(
            store.topic_patterns().len(),
            2,
            "same topic but different emotion stays separate"
        );
    }

    #[test]
    fn test_topic_pattern_no_merge_on_disjoint_topics() {
        let mut store = store();

        store.merge_topic_pattern(&["work".to_string()], EmotionCategory::Calm, Uuid::new_v4());
        store.merge_topic_pattern(&["travel".to_string()], EmotionCategory::Calm, Uuid::new_v4());

        assert_eq!(store.topic_patterns().len(), 2);
    }

    #[test]
    fn test_profile_upserts() {
        let mut store = store();

        store.set_relationship("Ana", "sister");
        store.set_relationship("Ana", "older sister");
        assert_eq!(store.relationships().len(), 1);
        assert_eq!(store.relationships()[0].relation, "older sister");

        store.add_goal("run a marathon");
        store.add_goal("run a marathon");
        assert_eq!(store.goals().len(), 1);
        assert!(store.complete_goal("run a marathon"));
        assert!(!store.goals()[0].active);

        store.add_interest("jazz");
        store.add_interest("jazz");
        assert_eq!(store.interests().len(), 1);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut store = store();
        store.insert(conversation("hello").with_embedding(vec![0.5, 0.5]));
        store.insert(Memory::new(
            "u1",
            MemoryKind::Fact,
            MemoryPayload::Fact {
                text: "likes tea".to_string(),
            },
        ));
        store.set_relationship("Ana", "sister");
        store.add_interest("jazz");

        let snapshot = store.snapshot();
        let restored = OwnerStore::from_snapshot(snapshot, RetentionConfig::default());

        assert_eq!(restored.conversations().len(), 1);
        assert_eq!(restored.facts().len(), 1);
        assert_eq!(restored.relationships().len(), 1);
        assert_eq!(restored.interests().len(), 1);
        assert_eq!(restored.index().len(), 1, "embeddings reindexed on load");
    }

    #[test]
    fn test_out_of_range_fields_clamped_on_insert() {
        let mut store = store();
        let mut memory = conversation("x");
        memory.salience = 9.0;
        memory.emotion_score = -7.0;
        let id = store.insert(memory);

        let stored = store
            .conversations()
            .iter()
            .find(|m| m.id == id)
            .unwrap();
        assert_eq!(stored.salience, 1.0);
        assert_eq!(stored.emotion_score, -1.0);
    }
}
