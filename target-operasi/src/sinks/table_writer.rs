use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use amr_client::domain::ScoredRecord;

use crate::{engine::ResultTable, pipeline::PipelineError};

/// Where a ranked table ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    fn open(&self) -> io::Result<Box<dyn Write>> {
        Ok(match self {
            OutputTarget::Stdout => Box::new(io::stdout().lock()),
            OutputTarget::File(path) => Box::new(BufWriter::new(File::create(path)?)),
        })
    }
}

impl From<Option<PathBuf>> for OutputTarget {
    fn from(path: Option<PathBuf>) -> Self {
        path.map_or(OutputTarget::Stdout, OutputTarget::File)
    }
}

/// Export sink for the ranked result.
pub trait TableWriter: Send + Sync {
    fn write(&self, ranked: &[ScoredRecord], table: &ResultTable) -> Result<(), PipelineError>;
}

/// Header row plus one row per record, cells as rendered by [`ResultTable`].
pub fn write_csv<W: Write>(table: &ResultTable, out: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(table.headers())?;
    for row in table.rows() {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One flat JSON object per record, keys in output column order.
pub fn write_ndjson<W: Write>(ranked: &[ScoredRecord], mut out: W) -> io::Result<()> {
    for record in ranked {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

pub struct CsvTableWriter {
    target: OutputTarget,
}

impl CsvTableWriter {
    pub fn new(target: OutputTarget) -> Self {
        Self { target }
    }
}

impl TableWriter for CsvTableWriter {
    fn write(&self, _ranked: &[ScoredRecord], table: &ResultTable) -> Result<(), PipelineError> {
        let out = self
            .target
            .open()
            .map_err(|e| PipelineError::Sink(format!("failed to open output: {e}")))?;
        write_csv(table, out).map_err(|e| PipelineError::Sink(format!("failed to write csv: {e}")))
    }
}

pub struct NdjsonTableWriter {
    target: OutputTarget,
}

impl NdjsonTableWriter {
    pub fn new(target: OutputTarget) -> Self {
        Self { target }
    }
}

impl TableWriter for NdjsonTableWriter {
    fn write(&self, ranked: &[ScoredRecord], _table: &ResultTable) -> Result<(), PipelineError> {
        let out = self
            .target
            .open()
            .map_err(|e| PipelineError::Sink(format!("failed to open output: {e}")))?;
        write_ndjson(ranked, out).map_err(|e| PipelineError::Sink(format!("failed to write ndjson: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amr_client::domain::{Indicator, IndicatorResult, MeterRecord};

    fn ranked() -> Vec<ScoredRecord> {
        let mut record = MeterRecord::new("5100");
        record.name = Some("WARUNG, SARI".to_string());
        let indicators: IndicatorResult = [Indicator::VDrop, Indicator::UnbalanceI].into_iter().collect();
        vec![ScoredRecord::new(&record, indicators, 2, 2.0, true)]
    }

    #[test]
    fn csv_output_has_header_and_quoted_cells() {
        let records = ranked();
        let table = ResultTable::from_scored(&records);
        let mut buf = Vec::new();
        write_csv(&table, &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("IDPEL,NAMA,TARIF,DAYA,NAMAUP,GARDU,v_drop,"));
        assert!(header.ends_with(",indicator_count,score,passes_criteria"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("5100,\"WARUNG, SARI\",,,,,true,false,"));
        assert!(row.ends_with(",2,2,true"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn ndjson_output_is_flat_and_ordered() {
        let mut buf = Vec::new();
        write_ndjson(&ranked(), &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let line = text.lines().next().unwrap();
        assert!(line.starts_with(r#"{"IDPEL":"5100","NAMA":"WARUNG, SARI","TARIF":null"#));
        assert!(line.contains(r#""v_drop":true,"v_lost":false"#));
        assert!(line.ends_with(r#""indicator_count":2,"score":2.0,"passes_criteria":true}"#));
    }

    #[test]
    fn csv_writer_writes_to_file_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hasil.csv");
        let records = ranked();
        let writer = CsvTableWriter::new(OutputTarget::File(path.clone()));
        writer.write(&records, &ResultTable::from_scored(&records)).unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
