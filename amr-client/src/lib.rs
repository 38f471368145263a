//! Domain types and input schema for AMR (automatic meter reading) anomaly
//! screening.

pub mod domain;
pub mod schema;
