//! Core types and configuration for the trade-tape system.
//!
//! This crate provides shared types used across all other crates:
//! - Trade records, normalized ticks, OHLCV bars
//! - Participant counts, strategy labels and rollups
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
