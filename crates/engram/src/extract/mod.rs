//! Derivation of secondary memory records from conversation turns
//!
//! The extractor runs three independent detections over a turn: emotional
//! state, life events, and topic patterns. It is a pure function of its
//! input plus read-only access to the owner's existing life-event history
//! (for the time-windowed dedup decision). Extraction is best-effort and
//! never blocks conversation storage: malformed or empty input yields empty
//! results rather than an error.

pub mod emotion;
pub mod life_event;
pub mod topics;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::memory::LifeEventCategory;

pub use emotion::{EmotionClassifier, EmotionReading, KeywordEmotionClassifier};
pub use life_event::{KeywordLifeEventClassifier, LifeEventCandidate, LifeEventClassifier};
pub use topics::detect_topics;

/// One raw conversation turn entering the extractor.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub owner_id: String,
    pub user_message: String,
    pub assistant_message: String,
}

/// Everything derived from one turn. Any field may be empty; the caller
/// decides what to store.
#[derive(Debug, Clone, Default)]
pub struct ExtractedMemories {
    pub emotional_state: Option<EmotionReading>,
    pub life_event: Option<LifeEventCandidate>,
    /// Topic set for this turn, merged into TopicPattern records by the store
    pub topics: Vec<String>,
}

impl ExtractedMemories {
    fn empty() -> Self {
        Self::default()
    }
}

/// Derives secondary memory records from raw conversation turns.
///
/// The classifiers sit behind traits so the keyword lexicons can be swapped
/// for real models without touching the orchestration.
pub struct MemoryExtractor {
    emotion: Box<dyn EmotionClassifier>,
    life_event: Box<dyn LifeEventClassifier>,
    /// Same-category life events inside this window are duplicates
    dedup_window: Duration,
}

impl Default for MemoryExtractor {
    fn default() -> Self {
        Self::new(24)
    }
}

impl MemoryExtractor {
    /// Keyword-backed extractor with the given life-event dedup window.
    pub fn new(dedup_window_hours: u64) -> Self {
        Self {
            emotion: Box::new(KeywordEmotionClassifier::new()),
            life_event: Box::new(KeywordLifeEventClassifier::new()),
            dedup_window: Duration::hours(dedup_window_hours as i64),
        }
    }

    /// Replace the classifiers, keeping the orchestration.
    pub fn with_classifiers(
        emotion: Box<dyn EmotionClassifier>,
        life_event: Box<dyn LifeEventClassifier>,
        dedup_window_hours: u64,
    ) -> Self {
        Self {
            emotion,
            life_event,
            dedup_window: Duration::hours(dedup_window_hours as i64),
        }
    }

    /// Run all three detections over a turn.
    ///
    /// `existing_events` is the owner's stored life-event history as
    /// `(category, created_at)` pairs; a candidate whose category already
    /// occurs within the dedup window is discarded. The window is
    /// time-based only - two genuinely distinct same-category events on the
    /// same day suppress each other, which matches the stored behavior this
    /// engine replicates.
    pub fn extract(
        &self,
        turn: &ConversationTurn,
        existing_events: &[(LifeEventCategory, DateTime<Utc>)],
    ) -> ExtractedMemories {
        if turn.user_message.trim().is_empty() {
            return ExtractedMemories::empty();
        }

        let emotional_state = Some(self.emotion.classify(&turn.user_message));

        let life_event = self
            .life_event
            .classify(&turn.user_message)
            .filter(|candidate| !self.is_duplicate_event(candidate.category, existing_events));

        let topics = detect_topics(&turn.user_message, &turn.assistant_message);

        debug!(
            owner_id = %turn.owner_id,
            emotion = ?emotional_state.as_ref().map(|e| e.primary),
            life_event = ?life_event.as_ref().map(|e| e.category),
            topic_count = topics.len(),
            "Extracted memories from turn"
        );

        ExtractedMemories {
            emotional_state,
            life_event,
            topics,
        }
    }

    fn is_duplicate_event(
        &self,
        category: LifeEventCategory,
        existing: &[(LifeEventCategory, DateTime<Utc>)],
    ) -> bool {
        let cutoff = Utc::now() - self.dedup_window;
        existing
            .iter()
            .any(|(cat, created)| *cat == category && *created > cutoff)
    }
}
