use std::cmp::Ordering;

use amr_client::domain::ScoredRecord;

use crate::config::ThresholdConfig;

/// The Target Operasi criteria: enough indicators and enough score.
pub fn passes(indicator_count: usize, score: f64, cfg: &ThresholdConfig) -> bool {
    indicator_count >= cfg.min_indicators && score >= cfg.min_score
}

/// Score descending, then indicator count descending, then identifier
/// ascending.
pub fn ranking_order(a: &ScoredRecord, b: &ScoredRecord) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.indicator_count.cmp(&a.indicator_count))
        .then_with(|| a.id.cmp(&b.id))
}

/// Passing records in ranking order, at most `top_n` of them.
pub fn rank<I>(scored: I, top_n: usize) -> Vec<ScoredRecord>
where
    I: IntoIterator<Item = ScoredRecord>,
{
    let mut passing: Vec<ScoredRecord> = scored.into_iter().filter(|r| r.passes_criteria).collect();
    // Stable: fully tied rows keep input order.
    passing.sort_by(ranking_order);
    passing.truncate(top_n);
    passing
}
