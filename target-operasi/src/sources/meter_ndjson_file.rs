use std::{collections::HashMap, path::PathBuf, time::SystemTime};

use amr_client::{domain::MeterRecord, schema::read_record};
use async_stream::try_stream;
use futures::Stream;
use serde_json::{Map, Value};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

use crate::pipeline::{Envelope, PipelineError, Source};

/// NDJSON source for `MeterRecord`s.
///
/// Each non-blank line is a JSON object keyed by the same column names as the
/// spreadsheet export (`{"IDPEL": "5123", "VOLTAGE_L1": 228.4, ...}`).
/// Numbers, numeric strings and booleans are accepted for numeric and flag
/// columns; `null` counts as absent.
pub struct MeterNdjsonFileSource {
    path: PathBuf,
}

impl MeterNdjsonFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

/// Flatten a JSON row into upper-cased column name -> raw cell text.
fn row_cells(object: Map<String, Value>) -> HashMap<String, String> {
    object
        .into_iter()
        .filter_map(|(key, value)| {
            let cell = match value {
                Value::Null => return None,
                Value::String(s) => s,
                Value::Bool(b) => String::from(if b { "1" } else { "0" }),
                Value::Number(n) => n.to_string(),
                // Nested structures are not cells; make them fail coercion.
                other => other.to_string(),
            };
            Some((key.trim().to_ascii_uppercase(), cell))
        })
        .collect()
}

#[async_trait::async_trait]
impl Source<MeterRecord> for MeterNdjsonFileSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<MeterRecord>, PipelineError>> + Send>> {
        let path = self.path.clone();
        let s = try_stream! {
            let file = File::open(&path).await.map_err(|e| {
                PipelineError::Source(format!("failed to open {}: {e}", path.display()))
            })?;
            let reader = BufReader::new(file);
            let mut lines = reader.split(b'\n');
            let mut line_no = 0usize;

            while let Some(bytes) = lines.next_segment().await.map_err(|e| {
                PipelineError::Source(format!("failed to read ndjson line: {e}"))
            })? {
                line_no += 1;
                // Invalid UTF-8 inside a string value becomes U+FFFD.
                let line = String::from_utf8_lossy(&bytes);
                if line.trim().is_empty() {
                    continue;
                }

                let object: Map<String, Value> = match serde_json::from_str(&line) {
                    Ok(v) => v,
                    Err(e) => {
                        metrics::counter!("meter_ndjson_parse_errors_total").increment(1);
                        Err(PipelineError::Source(format!(
                            "failed to parse ndjson line {line_no}: {e}"
                        )))?
                    }
                };

                let cells = row_cells(object);
                let outcome = read_record(|column| cells.get(column).map(String::as_str));
                for issue in &outcome.issues {
                    metrics::counter!("meter_values_coerced_total").increment(1);
                    tracing::debug!(line = line_no, %issue, "coerced input cell");
                }

                yield Envelope {
                    payload: outcome.record,
                    received_at: SystemTime::now(),
                };
            }
        };

        Box::pin(s)
    }
}
