pub mod config;
pub mod engine;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use engine::{analyze, Analysis, AnalysisSummary, Engine};
pub use pipeline::{Envelope, Pipeline};
