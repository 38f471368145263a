//! The anomaly scoring engine.
//!
//! A pure batch transformation: records and a validated [`ThresholdConfig`]
//! in, scored and ranked records out. Nothing here performs IO, holds state
//! between calls, or mutates its inputs.

pub mod aggregate;
pub mod catalog;
pub mod frame;
pub mod rank;
pub mod table;

use std::collections::HashSet;

use amr_client::domain::{MeterRecord, ScoredRecord};
use serde::Serialize;

use crate::config::ThresholdConfig;

pub use aggregate::aggregate;
pub use catalog::{evaluate_record, Rule, CATALOG};
pub use frame::{evaluate_frame, MeterFrame};
pub use rank::{passes, rank};
pub use table::ResultTable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub total_records: usize,
    pub distinct_ids: usize,
    /// Records with at least one raised indicator.
    pub flagged_any: usize,
    /// Records meeting the Target Operasi criteria.
    pub passing: usize,
    /// Records in the ranked output (`min(passing, top_n)`).
    pub emitted: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Every input record, in input order.
    pub scored: Vec<ScoredRecord>,
    /// Passing records, ranked and truncated.
    pub ranked: Vec<ScoredRecord>,
    pub summary: AnalysisSummary,
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: ThresholdConfig,
}

impl Engine {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Evaluate, aggregate and classify every record.
    pub fn score(&self, records: &[MeterRecord]) -> Vec<ScoredRecord> {
        let frame = MeterFrame::from_records(records);
        let results = evaluate_frame(&frame, &self.config);

        records
            .iter()
            .zip(results)
            .map(|(record, indicators)| {
                let (count, score) = aggregate(&indicators, &self.config);
                let passing = passes(count, score, &self.config);
                ScoredRecord::new(record, indicators, count, score, passing)
            })
            .collect()
    }

    pub fn analyze(&self, records: &[MeterRecord]) -> Analysis {
        let scored = self.score(records);
        let ranked = rank(scored.iter().cloned(), self.config.top_n);

        let summary = AnalysisSummary {
            total_records: records.len(),
            distinct_ids: scored.iter().map(|r| r.id.as_str()).collect::<HashSet<_>>().len(),
            flagged_any: scored.iter().filter(|r| r.indicator_count > 0).count(),
            passing: scored.iter().filter(|r| r.passes_criteria).count(),
            emitted: ranked.len(),
        };

        Analysis {
            scored,
            ranked,
            summary,
        }
    }
}

/// One-shot [`Engine::analyze`].
pub fn analyze(records: &[MeterRecord], config: &ThresholdConfig) -> Analysis {
    Engine::new(config.clone()).analyze(records)
}
