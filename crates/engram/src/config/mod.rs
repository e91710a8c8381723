use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

/// Main configuration structure for Engram
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EngramConfig {
    /// Scoring signal weights
    #[serde(default)]
    pub scoring: ScoringWeights,
    /// Bounded-collection caps and dedup windows
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Context assembly limits
    #[serde(default)]
    pub context: ContextConfig,
    /// Snapshot persistence configuration
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl EngramConfig {
    /// Parse a TOML config string.
    pub fn from_toml(content: &str) -> crate::error::Result<Self> {
        let config: EngramConfig = toml::from_str(content)
            .map_err(|e| crate::error::EngramError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config.sanitized())
    }

    /// Clamp out-of-range values back to defaults. Misconfiguration is
    /// logged, never rejected.
    pub fn sanitized(mut self) -> Self {
        self.scoring = self.scoring.sanitized();
        self
    }
}

/// Weights for the five scoring signals.
///
/// Weights need not sum to 1; the total score is clamped, not renormalized.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScoringWeights {
    /// Semantic similarity weight
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// Time-decay weight
    #[serde(default = "default_beta")]
    pub beta: f32,
    /// Salience weight
    #[serde(default = "default_gamma")]
    pub gamma: f32,
    /// Emotion weight
    #[serde(default = "default_delta")]
    pub delta: f32,
    /// Access-frequency weight
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
    /// Exponential decay rate per day for the time-decay signal
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            beta: default_beta(),
            gamma: default_gamma(),
            delta: default_delta(),
            epsilon: default_epsilon(),
            decay_rate: default_decay_rate(),
        }
    }
}

/// Sane range for a single weight. Weights need not sum to 1, so only
/// negative or absurd values count as misconfiguration.
const WEIGHT_RANGE: std::ops::RangeInclusive<f32> = 0.0..=10.0;

impl ScoringWeights {
    /// Replace each out-of-range weight with its default, logging the reset.
    pub fn sanitized(mut self) -> Self {
        let mut fix = |name: &str, value: &mut f32, default: f32| {
            if !WEIGHT_RANGE.contains(value) || !value.is_finite() {
                warn!(
                    weight = name,
                    invalid = *value,
                    default,
                    "Scoring weight out of range, reset to default"
                );
                *value = default;
            }
        };
        fix("alpha", &mut self.alpha, default_alpha());
        fix("beta", &mut self.beta, default_beta());
        fix("gamma", &mut self.gamma, default_gamma());
        fix("delta", &mut self.delta, default_delta());
        fix("epsilon", &mut self.epsilon, default_epsilon());
        fix("decay_rate", &mut self.decay_rate, default_decay_rate());
        self
    }
}

fn default_alpha() -> f32 {
    0.6
}

fn default_beta() -> f32 {
    0.2
}

fn default_gamma() -> f32 {
    0.15
}

fn default_delta() -> f32 {
    0.05
}

fn default_epsilon() -> f32 {
    0.1
}

fn default_decay_rate() -> f32 {
    0.1
}

/// Bounded-collection caps and the life-event dedup window
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetentionConfig {
    /// Maximum Conversation memories per owner (oldest-first eviction)
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,
    /// Maximum EmotionalState memories per owner
    #[serde(default = "default_max_emotional_states")]
    pub max_emotional_states: usize,
    /// Window within which a same-category life event is dropped as a duplicate
    #[serde(default = "default_life_event_dedup_hours")]
    pub life_event_dedup_hours: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_conversations: default_max_conversations(),
            max_emotional_states: default_max_emotional_states(),
            life_event_dedup_hours: default_life_event_dedup_hours(),
        }
    }
}

fn default_max_conversations() -> usize {
    100
}

fn default_max_emotional_states() -> usize {
    50
}

fn default_life_event_dedup_hours() -> u64 {
    24
}

/// Context assembly limits
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ContextConfig {
    /// Maximum LifeEvent entries emitted per context
    #[serde(default = "default_max_life_events")]
    pub max_life_events: usize,
    /// How many recent EmotionalState records the trend is derived from
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
    /// Minimum stored EmotionalState records before a trend entry is emitted
    #[serde(default = "default_trend_min_records")]
    pub trend_min_records: usize,
    /// Multiplier for the index candidate pool before reranking
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_life_events: default_max_life_events(),
            trend_window: default_trend_window(),
            trend_min_records: default_trend_min_records(),
            candidate_multiplier: default_candidate_multiplier(),
        }
    }
}

fn default_max_life_events() -> usize {
    3
}

fn default_trend_window() -> usize {
    5
}

fn default_trend_min_records() -> usize {
    3
}

fn default_candidate_multiplier() -> usize {
    3
}

/// Snapshot persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Base directory for per-owner snapshot files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".engram"))
        .unwrap_or_else(|| PathBuf::from(".engram"))
}
