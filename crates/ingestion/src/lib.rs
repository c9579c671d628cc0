//! Data ingestion and normalization for the trade-tape system.
//!
//! This crate handles:
//! - Reading trade records from CSV
//! - Unit conversion and validation of raw records
//! - Fixed-interval bar aggregation with gap filling

pub mod source;
pub mod normalizer;
pub mod aggregator;

pub use source::{read_records, read_records_from_path, write_records, REQUIRED_COLUMNS};
pub use normalizer::{normalize, NormalizationStats, Normalizer};
pub use aggregator::{aggregate, BarAggregator, MAX_BARS};
