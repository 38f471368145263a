pub mod meter_csv_file;
pub mod meter_ndjson_file;

pub use meter_csv_file::MeterCsvFileSource;
pub use meter_ndjson_file::MeterNdjsonFileSource;
