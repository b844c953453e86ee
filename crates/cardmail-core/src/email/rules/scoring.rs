//! Confidence scoring.

use crate::models::config::ScoringConfig;
use crate::models::transaction::ExtractionField;

/// Confidence for a complete extraction, `None` when any field is absent.
pub fn score<M, D, A>(
    merchant: &ExtractionField<M>,
    date: &ExtractionField<D>,
    amount: &ExtractionField<A>,
    config: &ScoringConfig,
) -> Option<f32> {
    if !(merchant.is_present() && date.is_present() && amount.is_present()) {
        return None;
    }

    let specific = [
        merchant.is_issuer_specific(),
        date.is_issuer_specific(),
        amount.is_issuer_specific(),
    ]
    .into_iter()
    .filter(|&s| s)
    .count();

    let base = config.base.clamp(0.0, 1.0);
    let bonus = (config.specificity_bonus * specific as f32).min(1.0 - base);
    Some((base + bonus).clamp(0.0, 1.0))
}
