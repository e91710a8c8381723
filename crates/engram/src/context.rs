//! Context assembly
//!
//! Builds the ordered, bounded context sequence for a query: scored
//! conversation summaries first, then the derived emotion trend, matching
//! life events, and the owner's profile categories in a fixed emission
//! order. Emitting a conversation bumps its access stats exactly once per
//! call; read-only sections are byte-stable across repeated calls.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::{ContextConfig, ScoringWeights};
use crate::index::IndexFilter;
use crate::memory::{EmotionCategory, Memory, MemoryKind, MemoryPayload};
use crate::scoring;
use crate::store::OwnerStore;

/// Where a context entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    Conversation,
    EmotionTrend,
    LifeEvent,
    Fact,
    Preference,
    Relationship,
    Goal,
    Interest,
}

/// One entry in the assembled context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub text: String,
    pub source: ContextSource,
    /// Set when the entry is backed by a stored memory.
    pub source_id: Option<Uuid>,
}

/// Assembles context sequences from an owner's store.
pub struct ContextAssembler {
    weights: ScoringWeights,
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(weights: ScoringWeights, config: ContextConfig) -> Self {
        Self { weights, config }
    }

    /// Build the context for a query against one owner's store.
    ///
    /// Takes `&mut` because emitted conversations have their access stats
    /// updated; everything else is read-only.
    pub fn assemble(
        &self,
        store: &mut OwnerStore,
        query_text: &str,
        query_embedding: Option<&[f32]>,
        max_items: usize,
    ) -> Vec<ContextEntry> {
        let mut entries = Vec::new();
        let mut seen: HashSet<Uuid> = HashSet::new();

        // (1) Top conversations by score. The index narrows candidates when
        // a query embedding is available; otherwise every conversation is a
        // candidate and the semantic signal is zero for all of them.
        let accessed = self.conversation_entries(
            store,
            query_embedding,
            max_items,
            &mut entries,
            &mut seen,
        );
        for id in accessed {
            store.mark_conversation_accessed(id);
        }

        // (2) Emotion trend, one entry at most.
        if let Some(trend) = self.emotion_trend(store) {
            entries.push(ContextEntry {
                text: format!("Recent emotional trend: {}", trend.label()),
                source: ContextSource::EmotionTrend,
                source_id: None,
            });
        }

        // (3) Life events sharing a token with the query.
        self.life_event_entries(store, query_text, &mut entries, &mut seen);

        // (4) Facts, semicolon-joined into a single entry.
        let facts: Vec<&str> = store
            .facts()
            .iter()
            .filter_map(|m| match &m.payload {
                MemoryPayload::Fact { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if !facts.is_empty() {
            entries.push(ContextEntry {
                text: format!("Known facts: {}", facts.join("; ")),
                source: ContextSource::Fact,
                source_id: None,
            });
        }

        // (5) Preferences.
        for memory in store.preferences() {
            if let MemoryPayload::Preference { key, value } = &memory.payload {
                if seen.insert(memory.id) {
                    entries.push(ContextEntry {
                        text: format!("Preference: {key} = {value}"),
                        source: ContextSource::Preference,
                        source_id: Some(memory.id),
                    });
                }
            }
        }

        // (6) Relationships.
        for rel in store.relationships() {
            entries.push(ContextEntry {
                text: format!("{} ({})", rel.name, rel.relation),
                source: ContextSource::Relationship,
                source_id: None,
            });
        }

        // (7) Active goals only.
        for goal in store.goals().iter().filter(|g| g.active) {
            entries.push(ContextEntry {
                text: format!("Goal: {}", goal.description),
                source: ContextSource::Goal,
                source_id: None,
            });
        }

        // (8) Interests.
        for interest in store.interests() {
            entries.push(ContextEntry {
                text: format!("Interested in {interest}"),
                source: ContextSource::Interest,
                source_id: None,
            });
        }

        debug!(
            owner_id = %store.owner_id(),
            entries = entries.len(),
            "Assembled context"
        );
        entries
    }

    /// Emit up to `max_items` conversation entries and return the ids whose
    /// access stats must be bumped. Each id is returned at most once even
    /// when a memory surfaces through multiple signals.
    fn conversation_entries(
        &self,
        store: &OwnerStore,
        query_embedding: Option<&[f32]>,
        max_items: usize,
        entries: &mut Vec<ContextEntry>,
        seen: &mut HashSet<Uuid>,
    ) -> Vec<Uuid> {
        let conversations = store.conversations();
        if conversations.is_empty() || max_items == 0 {
            return Vec::new();
        }

        let candidates: Vec<&Memory> = if query_embedding.is_some() && !store.index().is_empty() {
            let k = max_items.saturating_mul(self.config.candidate_multiplier.max(1));
            let filter = IndexFilter::new().with_kind(MemoryKind::Conversation);
            let outcome = store.index().search(query_embedding, k, &filter);
            let hit_ids: HashSet<Uuid> = outcome.hits.iter().map(|h| h.id).collect();
            // Conversations stored without an embedding never appear in the
            // hits; keep them in the pool so their non-semantic signals
            // still compete in the rerank.
            let pool: Vec<&Memory> = conversations
                .iter()
                .filter(|m| hit_ids.contains(&m.id) || m.embedding.is_none())
                .collect();
            if pool.is_empty() {
                conversations.iter().collect()
            } else {
                pool
            }
        } else {
            conversations.iter().collect()
        };

        let ranked = scoring::top_k(query_embedding, candidates, &self.weights, max_items);

        let mut accessed = Vec::new();
        for (memory, result) in ranked {
            if !seen.insert(memory.id) {
                continue;
            }
            let text = match &memory.payload {
                MemoryPayload::Conversation { summary, .. } => summary.clone(),
                other => format!("{other:?}"),
            };
            debug!(memory_id = %memory.id, score = result.total, "Context conversation");
            entries.push(ContextEntry {
                text,
                source: ContextSource::Conversation,
                source_id: Some(memory.id),
            });
            accessed.push(memory.id);
        }
        accessed
    }

    /// Dominant emotion over the most recent states, present only once
    /// enough records exist to call it a trend.
    fn emotion_trend(&self, store: &OwnerStore) -> Option<EmotionCategory> {
        let states = store.emotional_states();
        if states.len() < self.config.trend_min_records {
            return None;
        }

        let window = states
            .iter()
            .rev()
            .take(self.config.trend_window)
            .filter_map(|m| match &m.payload {
                MemoryPayload::EmotionalState { primary, .. } => Some(*primary),
                _ => None,
            });

        // Dominant by count; ties break toward the more recently seen
        // emotion, which the reverse iteration encounters first.
        let mut counts: Vec<(EmotionCategory, usize, usize)> = Vec::new();
        for (order, emotion) in window.enumerate() {
            if let Some(entry) = counts.iter_mut().find(|(e, _, _)| *e == emotion) {
                entry.1 += 1;
            } else {
                counts.push((emotion, 1, order));
            }
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
            .map(|(emotion, _, _)| emotion)
    }

    fn life_event_entries(
        &self,
        store: &OwnerStore,
        query_text: &str,
        entries: &mut Vec<ContextEntry>,
        seen: &mut HashSet<Uuid>,
    ) {
        let query_tokens = tokenize(query_text);
        if query_tokens.is_empty() {
            return;
        }

        let mut emitted = 0;
        for memory in store.life_events() {
            if emitted >= self.config.max_life_events {
                break;
            }
            let MemoryPayload::LifeEvent {
                category,
                description,
                ..
            } = &memory.payload
            else {
                continue;
            };
            let shares_token = tokenize(description)
                .iter()
                .any(|t| query_tokens.contains(t));
            if shares_token && seen.insert(memory.id) {
                entries.push(ContextEntry {
                    text: format!("Life event ({}): {description}", category.label()),
                    source: ContextSource::LifeEvent,
                    source_id: Some(memory.id),
                });
                emitted += 1;
            }
        }
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
