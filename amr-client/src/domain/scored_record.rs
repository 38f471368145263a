use super::{IndicatorResult, MeterRecord};

/// A meter record annotated with its indicator outcomes and aggregates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScoredRecord {
    #[cfg_attr(feature = "serde", serde(rename = "IDPEL"))]
    pub id: String,
    #[cfg_attr(feature = "serde", serde(rename = "NAMA"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "TARIF"))]
    pub tariff: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "DAYA"))]
    pub power_class: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "NAMAUP"))]
    pub unit: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "GARDU"))]
    pub substation: Option<String>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub indicators: IndicatorResult,
    pub indicator_count: usize,
    pub score: f64,
    pub passes_criteria: bool,
}

impl ScoredRecord {
    /// Carries the descriptive fields of `record` over; the identifier is
    /// trimmed.
    pub fn new(
        record: &MeterRecord,
        indicators: IndicatorResult,
        indicator_count: usize,
        score: f64,
        passes_criteria: bool,
    ) -> Self {
        Self {
            id: record.id.trim().to_string(),
            name: record.name.clone(),
            tariff: record.tariff.clone(),
            power_class: record.power_class.clone(),
            unit: record.unit.clone(),
            substation: record.substation.clone(),
            indicators,
            indicator_count,
            score,
            passes_criteria,
        }
    }
}
