use futures::StreamExt;
use serde::Serialize;

use amr_client::domain::MeterRecord;

use super::table_writer::TableWriter;
use crate::{
    engine::{AnalysisSummary, Engine, ResultTable},
    pipeline::{Envelope, PipelineError, Sink},
};

/// Outcome of one scoring run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub summary: AnalysisSummary,
    /// Rows dropped by transforms before scoring.
    pub rejected: usize,
    /// BLAKE3 digest of the exported table.
    pub digest: String,
}

/// Collects the whole batch, scores it and hands the ranked table to a
/// [`TableWriter`].
///
/// Transform errors drop the offending row and the run continues; source and
/// sink errors abort it.
pub struct ScoringSink {
    engine: Engine,
    writer: Box<dyn TableWriter>,
}

impl ScoringSink {
    pub fn new(engine: Engine, writer: Box<dyn TableWriter>) -> Self {
        Self { engine, writer }
    }
}

#[async_trait::async_trait]
impl Sink<MeterRecord> for ScoringSink {
    type Output = RunReport;

    async fn run<S>(&self, mut input: S) -> Result<RunReport, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<MeterRecord>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut batch: Vec<MeterRecord> = Vec::new();
        let mut rejected = 0usize;

        while let Some(item) = input.next().await {
            match item {
                Ok(env) => batch.push(env.payload),
                Err(e @ PipelineError::Transform(_)) => {
                    tracing::error!(error = %e, "record rejected, skipping");
                    rejected += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "error in upstream pipeline for ScoringSink");
                    return Err(e);
                }
            }
        }

        let analysis = self.engine.analyze(&batch);
        let table = ResultTable::from_scored(&analysis.ranked);
        self.writer.write(&analysis.ranked, &table)?;

        let summary = analysis.summary;
        metrics::counter!("meter_records_scored_total").increment(summary.total_records as u64);
        metrics::counter!("target_operasi_candidates_total").increment(summary.passing as u64);

        let digest = table.digest();
        tracing::info!(
            total_records = summary.total_records,
            distinct_ids = summary.distinct_ids,
            flagged_any = summary.flagged_any,
            passing = summary.passing,
            emitted = summary.emitted,
            rejected,
            digest = %digest,
            "target operasi analysis complete"
        );

        Ok(RunReport {
            summary,
            rejected,
            digest,
        })
    }
}
