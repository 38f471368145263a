//! Input schema: column lookup, coercion and the default-filling reader.
//!
//! Upstream spreadsheets vary in completeness, so nothing here fails on a
//! missing column or a bad cell. Problems are reported as [`DataIssue`]s and
//! the affected value falls back to 0 (numeric) or `false` (flag).

pub mod columns;

use std::{borrow::Cow, collections::HashMap};

use crate::domain::MeterRecord;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataIssue {
    #[error("column '{0}' is absent, defaulting to 0")]
    MissingColumn(&'static str),
    #[error("invalid numeric value '{raw}' in column '{column}', coerced to 0")]
    InvalidNumericValue { column: &'static str, raw: String },
    #[error("column '{column}' holds invalid UTF-8, undecodable bytes replaced")]
    InvalidText { column: String },
}

/// Decode a raw cell. Invalid UTF-8 (Latin-1 or cp1252 exports) is kept with
/// U+FFFD replacements and reported.
pub fn decode_text<'a>(column: &str, raw: &'a [u8]) -> (Cow<'a, str>, Option<DataIssue>) {
    let text = String::from_utf8_lossy(raw);
    let issue = match text {
        Cow::Owned(_) => Some(DataIssue::InvalidText {
            column: column.to_string(),
        }),
        Cow::Borrowed(_) => None,
    };
    (text, issue)
}

/// Parse a numeric cell.
///
/// Empty cells are 0. A single decimal comma is accepted (`"0,85"`).
/// Unparsable and non-finite values are rejected.
pub fn coerce_numeric(column: &'static str, raw: &str) -> Result<f64, DataIssue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    let parsed = trimmed.parse::<f64>().ok().or_else(|| {
        if trimmed.matches(',').count() == 1 && !trimmed.contains('.') {
            trimmed.replace(',', ".").parse::<f64>().ok()
        } else {
            None
        }
    });

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(DataIssue::InvalidNumericValue {
            column,
            raw: raw.to_string(),
        }),
    }
}

/// Digital flag cells: `1`, `true`, `yes`, `y` (any case) are set.
pub fn coerce_flag(raw: &str) -> bool {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<f64>() {
        return v == 1.0;
    }
    ["true", "yes", "y"].iter().any(|t| trimmed.eq_ignore_ascii_case(t))
}

fn optional_text(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Case-insensitive header positions of a tabular file.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut positions = HashMap::new();
        for (idx, header) in headers.into_iter().enumerate() {
            // First occurrence wins on duplicate headers.
            positions.entry(header.trim().to_ascii_uppercase()).or_insert(idx);
        }
        Self { positions }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(&column.to_ascii_uppercase()).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Catalog columns that this header row lacks.
    ///
    /// The identifier counts as missing only when neither `IDPEL` nor
    /// `LOCATION_CODE` is present.
    pub fn missing_columns(&self) -> Vec<DataIssue> {
        let mut missing = Vec::new();
        if !columns::IDENTIFIER.iter().any(|c| self.contains(c)) {
            missing.push(DataIssue::MissingColumn(columns::IDPEL));
        }
        missing.extend(
            columns::NUMERIC
                .iter()
                .chain(columns::FLAGS.iter())
                .filter(|c| !self.contains(c))
                .map(|c| DataIssue::MissingColumn(*c)),
        );
        missing
    }
}

/// A record read from one input row plus the cells that had to be coerced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    pub record: MeterRecord,
    pub issues: Vec<DataIssue>,
}

/// Build a [`MeterRecord`] from a column lookup.
///
/// `lookup` returns the raw cell for a column name, or `None` when the column
/// does not exist. Absent columns default silently; invalid cells default
/// and are reported.
pub fn read_record<'a, F>(lookup: F) -> ReadOutcome
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut issues = Vec::new();
    let mut numeric = |column: &'static str| -> f64 {
        match lookup(column).map(|raw| coerce_numeric(column, raw)) {
            Some(Ok(v)) => v,
            Some(Err(issue)) => {
                issues.push(issue);
                0.0
            }
            None => 0.0,
        }
    };

    let voltage = columns::VOLTAGE.map(&mut numeric);
    let current = columns::CURRENT.map(&mut numeric);
    let current_n = numeric(columns::CURRENT_N);
    let active_power = columns::ACTIVE_POWER.map(&mut numeric);
    let power_factor = columns::POWER_FACTOR.map(&mut numeric);
    let active_power_day = numeric(columns::ACTIVE_POWER_SIANG);
    let active_power_night = numeric(columns::ACTIVE_POWER_MALAM);
    let kwh_import = numeric(columns::KWH_IMP);
    let kwh_export = numeric(columns::KWH_EXP);

    let id = columns::IDENTIFIER
        .iter()
        .find_map(|c| optional_text(lookup(c)))
        .unwrap_or_default();

    let record = MeterRecord {
        id,
        name: optional_text(lookup(columns::NAMA)),
        tariff: optional_text(lookup(columns::TARIF)),
        power_class: optional_text(lookup(columns::DAYA)),
        unit: optional_text(lookup(columns::NAMAUP)),
        substation: optional_text(lookup(columns::GARDU)),
        voltage,
        current,
        current_n,
        active_power,
        power_factor,
        active_power_day,
        active_power_night,
        kwh_import,
        kwh_export,
        current_loop: lookup(columns::CURRENT_LOOP).is_some_and(coerce_flag),
        freeze: lookup(columns::FREEZE).is_some_and(coerce_flag),
    };

    ReadOutcome { record, issues }
}
