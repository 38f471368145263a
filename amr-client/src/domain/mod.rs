pub mod indicator;
pub mod meter_record;
pub mod scored_record;

pub use indicator::{Gate, Indicator, IndicatorResult, UnknownIndicator};
pub use meter_record::MeterRecord;
pub use scored_record::ScoredRecord;
