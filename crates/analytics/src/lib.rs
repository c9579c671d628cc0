//! Analysis over normalized trade ticks for the trade-tape system.
//!
//! This crate handles:
//! - Per-participant trade counts (buyers and sellers)
//! - Strategy-level rollups with an explicit unlabeled bucket
//! - Moving-average overlays for charting
//! - The end-to-end analysis pipeline

pub mod ranking;
pub mod moving_average;
pub mod pipeline;

pub use ranking::{rank, rollup};
pub use moving_average::{overlays, MovingAverage, Overlay};
pub use pipeline::{Analysis, Pipeline};
