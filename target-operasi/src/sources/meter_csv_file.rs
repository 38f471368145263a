use std::{fs::File, path::PathBuf, time::SystemTime};

use amr_client::{
    domain::MeterRecord,
    schema::{decode_text, read_record, HeaderIndex},
};

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// Delimited-text source for `MeterRecord`s.
///
/// Columns are matched by header name, case-insensitively (see
/// `amr_client::schema::columns`). Missing columns and unparsable cells
/// default to 0 and are logged, never fatal. Text that is not valid UTF-8 is
/// kept with replacement characters. The delimiter defaults to `,`;
/// AMR `.dat` exports use `|`.
pub struct MeterCsvFileSource {
    path: PathBuf,
    delimiter: u8,
}

impl MeterCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

#[async_trait::async_trait]
impl Source<MeterRecord> for MeterCsvFileSource {
    async fn stream(&self) -> EnvelopeStream<MeterRecord> {
        // Blocking reader inside a single async task; inputs are spreadsheet
        // exports of at most a few thousand rows.
        let path = self.path.clone();
        let delimiter = self.delimiter;
        let s = async_stream::try_stream! {
            let file = File::open(&path)
                .map_err(|e| PipelineError::Source(format!("failed to open {}: {e}", path.display())))?;
            let mut rdr = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .flexible(true)
                .from_reader(file);
            // Bytes, not strings: one undecodable cell must not cost the row.
            let headers: Vec<String> = rdr
                .byte_headers()
                .map_err(|e| PipelineError::Source(format!("failed to read headers: {e}")))?
                .iter()
                .map(|h| String::from_utf8_lossy(h).into_owned())
                .collect();

            let index = HeaderIndex::new(headers.iter().map(String::as_str));
            for issue in index.missing_columns() {
                tracing::warn!(path = %path.display(), %issue, "input column missing");
            }

            for (row, result) in rdr.byte_records().enumerate() {
                let record = match result {
                    Ok(r) => r,
                    Err(e) => {
                        metrics::counter!("meter_csv_parse_errors_total").increment(1);
                        Err(PipelineError::Source(format!("failed to read record: {e}")))?
                    }
                };

                let mut issues = Vec::new();
                let cells: Vec<_> = record
                    .iter()
                    .enumerate()
                    .map(|(idx, raw)| {
                        let column = headers.get(idx).map_or("", String::as_str);
                        let (text, issue) = decode_text(column, raw);
                        issues.extend(issue);
                        text
                    })
                    .collect();

                let outcome = read_record(|column| {
                    index.position(column).and_then(|idx| cells.get(idx)).map(|c| &**c)
                });
                issues.extend(outcome.issues);
                for issue in &issues {
                    metrics::counter!("meter_values_coerced_total").increment(1);
                    // Row numbers count the header as line 1.
                    tracing::debug!(line = row + 2, %issue, "coerced input cell");
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
