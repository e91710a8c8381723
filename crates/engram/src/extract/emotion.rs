//! Keyword-based emotional-state detection
//!
//! Deterministic lexicon lookup, no hidden state. The classifier sits
//! behind a trait so a learned model can replace it later.

use crate::memory::{EmotionCategory, Intensity};

/// Detected emotional state for one conversation turn.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionReading {
    /// First matching category in priority order; Neutral when nothing matches
    pub primary: EmotionCategory,
    /// Remaining matched categories, in priority order
    pub secondary: Vec<EmotionCategory>,
    pub intensity: Intensity,
}

impl EmotionReading {
    /// A reading with no detected emotion.
    pub fn neutral() -> Self {
        Self {
            primary: EmotionCategory::Neutral,
            secondary: Vec::new(),
            intensity: Intensity::Medium,
        }
    }
}

/// Classifies the emotional content of a piece of text.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, text: &str) -> EmotionReading;
}

/// Default lexicon-backed classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordEmotionClassifier;

impl KeywordEmotionClassifier {
    pub fn new() -> Self {
        Self
    }

    fn keywords(category: EmotionCategory) -> &'static [&'static str] {
        match category {
            EmotionCategory::Happy => &[
                "happy", "glad", "joyful", "delighted", "cheerful", "wonderful", "pleased",
                "content", "smiling",
            ],
            EmotionCategory::Sad => &[
                "sad", "unhappy", "depressed", "miserable", "heartbroken", "crying", "tearful",
                "lonely", "down",
            ],
            EmotionCategory::Angry => &[
                "angry", "furious", "annoyed", "irritated", "frustrated", "outraged", "mad at",
            ],
            EmotionCategory::Anxious => &[
                "anxious", "worried", "nervous", "stressed", "afraid", "scared", "uneasy",
                "overwhelmed", "panicking",
            ],
            EmotionCategory::Excited => &[
                "excited", "thrilled", "can't wait", "cant wait", "pumped", "eager", "stoked",
            ],
            EmotionCategory::Calm => &[
                "calm", "relaxed", "peaceful", "at ease", "serene", "settled down",
            ],
            EmotionCategory::Neutral => &[],
        }
    }
}

impl EmotionClassifier for KeywordEmotionClassifier {
    fn classify(&self, text: &str) -> EmotionReading {
        let lowered = text.to_lowercase();

        let mut matched: Vec<EmotionCategory> = EmotionCategory::DETECTION_ORDER
            .iter()
            .copied()
            .filter(|category| {
                Self::keywords(*category)
                    .iter()
                    .any(|kw| lowered.contains(kw))
            })
            .collect();

        if matched.is_empty() {
            return EmotionReading::neutral();
        }

        let primary = matched.remove(0);
        EmotionReading {
            primary,
            secondary: matched,
            intensity: classify_intensity(&lowered),
        }
    }
}

const HIGH_INTENSITY_MARKERS: &[&str] = &[
    "extremely",
    "incredibly",
    "absolutely",
    "completely",
    "totally",
    "really",
    "so much",
    "beyond",
];

const LOW_INTENSITY_MARKERS: &[&str] = &[
    "slightly",
    "a bit",
    "a little",
    "somewhat",
    "kind of",
    "kinda",
    "mildly",
];

/// Classify intensity from a second marker lexicon; Medium when no marker
/// is present. Expects already-lowercased text.
pub fn classify_intensity(lowered: &str) -> Intensity {
    if HIGH_INTENSITY_MARKERS.iter().any(|m| lowered.contains(m)) {
        Intensity::High
    } else if LOW_INTENSITY_MARKERS.iter().any(|m| lowered.contains(m)) {
        Intensity::Low
    } else {
        Intensity::Medium
    }
}
