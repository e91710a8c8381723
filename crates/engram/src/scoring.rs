//! Multi-signal relevance scoring
//!
//! Pure functions mapping `(query embedding, memory, weights)` to a bounded
//! score with an explainable breakdown. Five signals contribute: semantic
//! similarity, dual time decay, salience, emotion polarity, and access
//! frequency. The total is clamped to [0, 1], never renormalized.

use chrono::Utc;

use crate::config::ScoringWeights;
use crate::index::cosine_similarity;
use crate::memory::Memory;

/// The five weighted terms making up a score.
///
/// Each field is the signal value already multiplied by its weight, so the
/// terms sum (within floating-point tolerance) to the pre-clamp total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub semantic: f32,
    pub time_decay: f32,
    pub salience: f32,
    pub emotion: f32,
    pub access_frequency: f32,
}

impl ScoreBreakdown {
    /// Sum of the weighted terms, i.e. the total before clamping.
    pub fn sum(&self) -> f32 {
        self.semantic + self.time_decay + self.salience + self.emotion + self.access_frequency
    }
}

/// A scored memory: bounded total plus its explainable breakdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    /// Final score, clamped to [0, 1]
    pub total: f32,
    pub breakdown: ScoreBreakdown,
}

/// Score one memory against a query embedding.
///
/// A missing query, a missing stored embedding, or mismatched lengths all
/// degrade the semantic term to 0; the other signals still contribute.
pub fn score(query: Option<&[f32]>, memory: &Memory, weights: &ScoringWeights) -> ScoreResult {
    let semantic = semantic_signal(query, memory);
    let (days_created, days_accessed) = age_days(memory);

    let time_decay = 0.7 * (-weights.decay_rate * days_created).exp()
        + 0.3 * (-weights.decay_rate * days_accessed).exp();
    let salience = memory.salience.clamp(0.0, 1.0);
    let emotion = (memory.emotion_score.clamp(-1.0, 1.0) + 1.0) / 2.0;
    let access_frequency = access_frequency_signal(memory.access_count, days_created);

    let breakdown = ScoreBreakdown {
        semantic: weights.alpha * semantic,
        time_decay: weights.beta * time_decay,
        salience: weights.gamma * salience,
        emotion: weights.delta * emotion,
        access_frequency: weights.epsilon * access_frequency,
    };

    ScoreResult {
        total: breakdown.sum().clamp(0.0, 1.0),
        breakdown,
    }
}

/// Sort memories descending by total score.
///
/// The sort is stable: memories with equal scores keep their input order.
pub fn rank<'a>(
    query: Option<&[f32]>,
    memories: impl IntoIterator<Item = &'a Memory>,
    weights: &ScoringWeights,
) -> Vec<(&'a Memory, ScoreResult)> {
    let mut scored: Vec<(&Memory, ScoreResult)> = memories
        .into_iter()
        .map(|m| (m, score(query, m, weights)))
        .collect();
    scored.sort_by(|a, b| b.1.total.total_cmp(&a.1.total));
    scored
}

/// The first `k` of the ranking.
pub fn top_k<'a>(
    query: Option<&[f32]>,
    memories: impl IntoIterator<Item = &'a Memory>,
    weights: &ScoringWeights,
    k: usize,
) -> Vec<(&'a Memory, ScoreResult)> {
    let mut ranked = rank(query, memories, weights);
    ranked.truncate(k);
    ranked
}

/// Diagnostic aggregate over a set of scores.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoringStats {
    pub count: usize,
    pub mean: f32,
    pub median: f32,
    pub min: f32,
    pub max: f32,
    /// Counts over ten equal buckets spanning [0, 1]
    pub histogram: [usize; 10],
}

/// Aggregate score statistics for observability.
pub fn scoring_stats<'a>(
    query: Option<&[f32]>,
    memories: impl IntoIterator<Item = &'a Memory>,
    weights: &ScoringWeights,
) -> ScoringStats {
    let mut totals: Vec<f32> = memories
        .into_iter()
        .map(|m| score(query, m, weights).total)
        .collect();

    if totals.is_empty() {
        return ScoringStats::default();
    }

    totals.sort_by(f32::total_cmp);
    let count = totals.len();
    let mean = totals.iter().sum::<f32>() / count as f32;
    let median = if count % 2 == 1 {
        totals[count / 2]
    } else {
        (totals[count / 2 - 1] + totals[count / 2]) / 2.0
    };

    let mut histogram = [0usize; 10];
    for total in &totals {
        let bucket = ((total * 10.0) as usize).min(9);
        histogram[bucket] += 1;
    }

    ScoringStats {
        count,
        mean,
        median,
        min: totals[0],
        max: totals[count - 1],
        histogram,
    }
}

fn semantic_signal(query: Option<&[f32]>, memory: &Memory) -> f32 {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return 0.0;
    };
    let Some(ref embedding) = memory.embedding else {
        return 0.0;
    };
    if query.len() != embedding.len() {
        return 0.0;
    }
    // Negative similarity is treated as no relevance
    cosine_similarity(query, embedding).max(0.0)
}

/// Fractional days since creation and since last access, floored at 0.
fn age_days(memory: &Memory) -> (f32, f32) {
    let now = Utc::now();
    let created = (now - memory.created_at).num_seconds().max(0) as f32 / 86_400.0;
    let accessed = (now - memory.last_accessed).num_seconds().max(0) as f32 / 86_400.0;
    (created, accessed)
}

/// `min(1, ln(1 + count / max(1, days)) / ln 10)` - logarithmic so one viral
/// day cannot dominate, capped so frequency never outranks semantics alone.
fn access_frequency_signal(access_count: u32, days_created: f32) -> f32 {
    let per_day = access_count as f32 / days_created.max(1.0);
    ((1.0 + per_day).ln() / 10.0_f32.ln()).min(1.0)
}
