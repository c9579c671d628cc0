//! Configuration structures for the trade-tape system.

use crate::error::{Error, Result};
use crate::types::{ParticipantId, Seconds, StrategyLabels};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Unit conversion for raw records.
    pub scale: ScaleConfig,
    /// Bar bucketing.
    pub aggregation: AggregationConfig,
    /// Participant ranking presentation.
    pub ranking: RankingConfig,
    /// Settings handed to the charting sink.
    pub chart: ChartConfig,
    /// Pipeline execution.
    pub pipeline: PipelineConfig,
    /// Strategy assignments by participant id range.
    pub strategies: Vec<StrategyAssignment>,
}

impl Config {
    /// Parse a TOML document. Missing sections take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check every section for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.scale.validate()?;
        self.aggregation.validate()?;
        if self.ranking.top_n == 0 {
            return Err(Error::config("ranking.top_n must be > 0"));
        }
        if self.chart.moving_average_windows.contains(&0) {
            return Err(Error::config("chart.moving_average_windows must be > 0"));
        }
        for assignment in &self.strategies {
            assignment.validate()?;
        }
        Ok(())
    }

    /// Build the participant → strategy mapping. Later entries win on overlap.
    pub fn labels(&self) -> StrategyLabels {
        let mut labels = StrategyLabels::new();
        for a in &self.strategies {
            labels.assign_range(a.first_id, a.last_id, &a.name);
        }
        labels
    }
}

/// Raw-to-canonical unit conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Raw timestamp units → seconds.
    pub time_scale: Decimal,
    /// Raw integer price → currency units.
    pub price_scale: Decimal,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            time_scale: Decimal::new(1, 1),
            price_scale: Decimal::new(1, 2),
        }
    }
}

impl ScaleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.time_scale <= Decimal::ZERO {
            return Err(Error::config("scale.time_scale must be > 0"));
        }
        if self.price_scale <= Decimal::ZERO {
            return Err(Error::config("scale.price_scale must be > 0"));
        }
        Ok(())
    }
}

/// Bar bucketing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Bucket width in seconds.
    pub interval_secs: Seconds,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            interval_secs: Decimal::from(5),
        }
    }
}

impl AggregationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs <= Decimal::ZERO {
            return Err(Error::config("aggregation.interval_secs must be > 0"));
        }
        Ok(())
    }
}

/// Ranking presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Rows shown in "top participants" tables.
    pub top_n: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { top_n: 5 }
    }
}

/// Settings for the external chart renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Moving-average windows in buckets.
    pub moving_average_windows: Vec<usize>,
    /// Chart title.
    pub title: String,
    /// Price axis label.
    pub ylabel: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            moving_average_windows: vec![3, 6],
            title: "Market Simulator - Simulation Results".to_string(),
            ylabel: "Price ($)".to_string(),
        }
    }
}

/// Pipeline execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run bar aggregation and ranking on separate threads.
    pub parallel: bool,
}

/// Widest id range a single strategy assignment may cover.
pub const MAX_STRATEGY_RANGE: u64 = 1_000_000;

/// A contiguous range of participant ids sharing a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAssignment {
    /// Strategy name.
    pub name: String,
    /// First id (inclusive).
    pub first_id: ParticipantId,
    /// Last id (inclusive).
    pub last_id: ParticipantId,
}

impl StrategyAssignment {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config("strategy name must not be empty"));
        }
        if self.first_id > self.last_id {
            return Err(Error::config(format!(
                "strategy '{}': first_id {} > last_id {}",
                self.name, self.first_id, self.last_id
            )));
        }
        if self.last_id - self.first_id >= MAX_STRATEGY_RANGE {
            return Err(Error::config(format!(
                "strategy '{}': range {}..={} covers more than {} ids",
                self.name, self.first_id, self.last_id, MAX_STRATEGY_RANGE
            )));
        }
        Ok(())
    }
}
