pub mod scoring;
pub mod table_writer;

pub use scoring::{RunReport, ScoringSink};
pub use table_writer::{CsvTableWriter, NdjsonTableWriter, OutputTarget, TableWriter};
