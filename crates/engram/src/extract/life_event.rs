//! Keyword-based life-event detection
//!
//! A fixed, ordered list of category lexicons; the first pattern matching
//! the user message produces one candidate. The time-windowed dedup against
//! existing events of the same category lives in the extractor, which has
//! read-only access to the owner's history.

use crate::extract::emotion::classify_intensity;
use crate::memory::{Intensity, LifeEventCategory};

/// A detected life-event candidate, not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct LifeEventCandidate {
    pub category: LifeEventCategory,
    pub description: String,
    pub importance: Intensity,
}

/// Detects life events in a user message.
pub trait LifeEventClassifier: Send + Sync {
    fn classify(&self, user_message: &str) -> Option<LifeEventCandidate>;
}

/// Default lexicon-backed classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordLifeEventClassifier;

/// Category patterns in detection order: first match wins.
const CATEGORY_PATTERNS: &[(LifeEventCategory, &[&str])] = &[
    (
        LifeEventCategory::Education,
        &[
            "graduated",
            "graduation",
            "my degree",
            "enrolled",
            "started university",
            "started college",
            "final exam",
        ],
    ),
    (
        LifeEventCategory::Career,
        &[
            "new job",
            "promotion",
            "promoted",
            "got hired",
            "job offer",
            "quit my job",
            "got fired",
            "laid off",
            "started working",
        ],
    ),
    (
        LifeEventCategory::Relationship,
        &[
            "got engaged",
            "got married",
            "wedding",
            "new girlfriend",
            "new boyfriend",
            "broke up",
            "divorce",
            "started dating",
        ],
    ),
    (
        LifeEventCategory::Family,
        &[
            "pregnant",
            "had a baby",
            "newborn",
            "my son was born",
            "my daughter was born",
            "family reunion",
        ],
    ),
    (
        LifeEventCategory::Residence,
        &[
            "moved to",
            "moving to",
            "new apartment",
            "new house",
            "relocating",
        ],
    ),
    (
        LifeEventCategory::Travel,
        &["trip to", "vacation", "travelling to", "traveling to", "flying to"],
    ),
    (
        LifeEventCategory::Health,
        &[
            "diagnosed",
            "surgery",
            "hospital",
            "injured",
            "recovering from",
        ],
    ),
    (
        LifeEventCategory::Loss,
        &["passed away", "died", "funeral", "grieving"],
    ),
    (
        LifeEventCategory::Achievement,
        &[
            "won the",
            "won an",
            "award",
            "achieved",
            "accomplished",
            "reached my goal",
        ],
    ),
    (
        LifeEventCategory::Challenge,
        &[
            "struggling with",
            "difficult time",
            "tough time",
            "hard time",
            "setback",
        ],
    ),
];

impl KeywordLifeEventClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl LifeEventClassifier for KeywordLifeEventClassifier {
    fn classify(&self, user_message: &str) -> Option<LifeEventCandidate> {
        let lowered = user_message.to_lowercase();

        for (category, patterns) in CATEGORY_PATTERNS {
            if patterns.iter().any(|p| lowered.contains(p)) {
                return Some(LifeEventCandidate {
                    category: *category,
                    description: user_message.trim().to_string(),
                    importance: classify_intensity(&lowered),
                });
            }
        }
        None
    }
}
