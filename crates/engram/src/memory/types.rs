//! Memory types for the Engram system
//!
//! Defines the core data structures for storing and retrieving memories,
//! including the main Memory struct and the kind-specific payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single memory unit stored for one owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Unique identifier, immutable after creation
    pub id: Uuid,
    /// Owner this memory belongs to; never shared across owners
    pub owner_id: String,
    /// Classification of what kind of memory this is
    pub kind: MemoryKind,
    /// Vector embedding; absent for non-semantic kinds
    pub embedding: Option<Vec<f32>>,
    /// When this memory was created
    pub created_at: DateTime<Utc>,
    /// When this memory was last surfaced in an assembled context
    pub last_accessed: DateTime<Utc>,
    /// How many times this memory has been surfaced
    pub access_count: u32,
    /// Caller-assigned importance, clamped to [0, 1]
    pub salience: f32,
    /// Emotional polarity, clamped to [-1, 1]
    pub emotion_score: f32,
    /// Kind-specific fields
    pub payload: MemoryPayload,
}

impl Memory {
    /// Create a new memory with default salience and neutral emotion.
    pub fn new(owner_id: impl Into<String>, kind: MemoryKind, payload: MemoryPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            kind,
            embedding: None,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            salience: 0.5,
            emotion_score: 0.0,
            payload,
        }
    }

    /// Attach an embedding vector.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Set salience, clamping out-of-range values instead of rejecting them.
    pub fn with_salience(mut self, salience: f32) -> Self {
        self.salience = salience.clamp(0.0, 1.0);
        self
    }

    /// Set emotion score, clamping out-of-range values instead of rejecting them.
    pub fn with_emotion_score(mut self, emotion_score: f32) -> Self {
        self.emotion_score = emotion_score.clamp(-1.0, 1.0);
        self
    }

    /// Mark this memory as surfaced, updating access count and timestamp.
    pub fn mark_accessed(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }

    /// Re-clamp bounded fields. Applied on every write path so snapshots
    /// loaded from disk also end up in range.
    pub fn clamp_bounds(&mut self) {
        self.salience = self.salience.clamp(0.0, 1.0);
        self.emotion_score = self.emotion_score.clamp(-1.0, 1.0);
        if self.last_accessed < self.created_at {
            self.last_accessed = self.created_at;
        }
    }
}

/// Classification of memory kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryKind {
    /// A summarized conversation turn
    Conversation,
    /// A user-stated fact
    Fact,
    /// A user preference
    Preference,
    /// An inferred life event
    LifeEvent,
    /// An inferred emotional state
    EmotionalState,
    /// A recurring topic pattern
    TopicPattern,
    /// Long-term knowledge written directly through the API
    LongTerm,
}

/// Kind-specific payload carried by a [`Memory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryPayload {
    Conversation {
        summary: String,
        topics: Vec<String>,
    },
    Fact {
        text: String,
    },
    Preference {
        key: String,
        value: String,
    },
    LifeEvent {
        category: LifeEventCategory,
        description: String,
        importance: Intensity,
    },
    EmotionalState {
        primary: EmotionCategory,
        secondary: Vec<EmotionCategory>,
        intensity: Intensity,
    },
    TopicPattern {
        topics: Vec<String>,
        dominant_emotion: EmotionCategory,
        frequency: u32,
        related_conversations: Vec<Uuid>,
    },
    LongTerm {
        text: String,
    },
}

impl MemoryPayload {
    /// Kind this payload belongs to.
    pub fn kind(&self) -> MemoryKind {
        match self {
            MemoryPayload::Conversation { .. } => MemoryKind::Conversation,
            MemoryPayload::Fact { .. } => MemoryKind::Fact,
            MemoryPayload::Preference { .. } => MemoryKind::Preference,
            MemoryPayload::LifeEvent { .. } => MemoryKind::LifeEvent,
            MemoryPayload::EmotionalState { .. } => MemoryKind::EmotionalState,
            MemoryPayload::TopicPattern { .. } => MemoryKind::TopicPattern,
            MemoryPayload::LongTerm { .. } => MemoryKind::LongTerm,
        }
    }
}

/// Emotional categories detected by the extractor.
///
/// Variant order is the detection priority order: when a turn matches
/// multiple categories, the first matching variant becomes the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionCategory {
    Happy,
    Sad,
    Angry,
    Anxious,
    Excited,
    Calm,
    /// No category matched; downstream scoring always has a defined value
    Neutral,
}

impl EmotionCategory {
    /// The six detectable categories in fixed priority order.
    pub const DETECTION_ORDER: [EmotionCategory; 6] = [
        EmotionCategory::Happy,
        EmotionCategory::Sad,
        EmotionCategory::Angry,
        EmotionCategory::Anxious,
        EmotionCategory::Excited,
        EmotionCategory::Calm,
    ];

    /// Polarity of this emotion in [-1, 1], used as a memory's emotion score.
    pub fn polarity(&self) -> f32 {
        match self {
            EmotionCategory::Happy | EmotionCategory::Excited => 0.8,
            EmotionCategory::Calm => 0.4,
            EmotionCategory::Neutral => 0.0,
            EmotionCategory::Anxious => -0.5,
            EmotionCategory::Sad | EmotionCategory::Angry => -0.8,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EmotionCategory::Happy => "happy",
            EmotionCategory::Sad => "sad",
            EmotionCategory::Angry => "angry",
            EmotionCategory::Anxious => "anxious",
            EmotionCategory::Excited => "excited",
            EmotionCategory::Calm => "calm",
            EmotionCategory::Neutral => "neutral",
        }
    }
}

/// Intensity classification for emotions and life-event importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    High,
    Medium,
    Low,
}

impl Intensity {
    pub fn label(&self) -> &'static str {
        match self {
            Intensity::High => "high",
            Intensity::Medium => "medium",
            Intensity::Low => "low",
        }
    }
}

/// Life-event categories in detection order: the first category whose
/// keyword pattern matches the user message wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeEventCategory {
    Education,
    Career,
    Relationship,
    Family,
    Residence,
    Travel,
    Health,
    Loss,
    Achievement,
    Challenge,
}

impl LifeEventCategory {
    pub fn label(&self) -> &'static str {
        match self {
            LifeEventCategory::Education => "education",
            LifeEventCategory::Career => "career",
            LifeEventCategory::Relationship => "relationship",
            LifeEventCategory::Family => "family",
            LifeEventCategory::Residence => "residence",
            LifeEventCategory::Travel => "travel",
            LifeEventCategory::Health => "health",
            LifeEventCategory::Loss => "loss",
            LifeEventCategory::Achievement => "achievement",
            LifeEventCategory::Challenge => "challenge",
        }
    }
}
