use amr_client::{
    domain::{Indicator, ScoredRecord},
    schema::columns,
};

pub const INDICATOR_COUNT_COLUMN: &str = "indicator_count";
pub const SCORE_COLUMN: &str = "score";
pub const PASSES_COLUMN: &str = "passes_criteria";

/// Output column names, in order.
pub fn headers() -> Vec<&'static str> {
    columns::DESCRIPTIVE
        .into_iter()
        .chain(Indicator::ALL.into_iter().map(Indicator::column))
        .chain([INDICATOR_COUNT_COLUMN, SCORE_COLUMN, PASSES_COLUMN])
        .collect()
}

/// Flat, string-celled rendition of ranked records for display and export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

fn row_cells(record: &ScoredRecord) -> Vec<String> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let mut cells = vec![
        record.id.clone(),
        text(&record.name),
        text(&record.tariff),
        text(&record.power_class),
        text(&record.unit),
        text(&record.substation),
    ];
    cells.extend(record.indicators.iter().map(|(_, raised)| raised.to_string()));
    cells.push(record.indicator_count.to_string());
    // Display for f64 prints the shortest representation that round-trips.
    cells.push(record.score.to_string());
    cells.push(record.passes_criteria.to_string());
    cells
}

impl ResultTable {
    pub fn from_scored(records: &[ScoredRecord]) -> Self {
        Self {
            headers: headers(),
            rows: records.iter().map(row_cells).collect(),
        }
    }

    pub fn headers(&self) -> &[&'static str] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// BLAKE3 digest over headers and cells. Identical tables, including row
    /// order, have identical digests.
    pub fn digest(&self) -> String {
        let mut h = blake3::Hasher::new();
        for header in &self.headers {
            hash_str(&mut h, header);
        }
        for row in &self.rows {
            h.update(&(row.len() as u32).to_le_bytes());
            for cell in row {
                hash_str(&mut h, cell);
            }
        }
        h.finalize().to_hex().to_string()
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    let len = s.len() as u32;
    hasher.update(&len.to_le_bytes());
    hasher.update(s.as_bytes());
}
