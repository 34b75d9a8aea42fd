//! Confidence estimator — scalar trust score gating human review.

use crate::store::SimilarMessage;
use crate::triage::types::Classification;

/// Base confidence before any boost.
const BASE_CONFIDENCE: f32 = 0.7;

/// Boost when the rule engine ran for this message.
///
/// "Ran" means the engine was invoked, NOT that any rule fired — the
/// orchestrator sets its `rules_applied` flag unconditionally once the rule
/// stage is reached, and this formula keys off that flag.
const RULES_APPLIED_BOOST: f32 = 0.2;

/// Weight of the neighbor-agreement fraction.
const NEIGHBOR_AGREEMENT_WEIGHT: f32 = 0.1;

/// Scores below this require human review (strict inequality).
const REVIEW_THRESHOLD: f32 = 0.6;

/// Derives a trust score from rule application and neighbor agreement.
#[derive(Debug, Default)]
pub struct ConfidenceEstimator;

impl ConfidenceEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Confidence in `classification`, in [0, 1].
    pub fn score(
        &self,
        classification: &Classification,
        rules_applied: bool,
        similar: &[SimilarMessage],
    ) -> f32 {
        let mut confidence = BASE_CONFIDENCE;

        if rules_applied {
            confidence += RULES_APPLIED_BOOST;
        }

        if !similar.is_empty() {
            let matching = similar
                .iter()
                .filter(|s| s.category == classification.category)
                .count();
            let agreement = matching as f32 / similar.len() as f32;
            confidence += agreement * NEIGHBOR_AGREEMENT_WEIGHT;
        }

        confidence.clamp(0.0, 1.0)
    }

    /// Whether a score is too low to skip human review.
    ///
    /// Strict: exactly [`REVIEW_THRESHOLD`] does not require review.
    pub fn needs_review(&self, score: f32) -> bool {
        score < REVIEW_THRESHOLD
    }
}
