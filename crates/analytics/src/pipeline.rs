//! End-to-end analysis pipeline.
//!
//! raw records → normalizer → ticks → {bar aggregation, participant ranking}.
//! The two branches only read the tick sequence, so they can run on separate
//! threads without coordination.

use crate::moving_average::{overlays, Overlay};
use crate::ranking::{rank, rollup};
use rust_decimal::Decimal;
use serde::Serialize;
use tape_core::config::ScaleConfig;
use tape_core::{
    Bar, Config, Error, NormalizedTick, ParticipantCounts, RawTradeRecord, Result,
    StrategyLabels, StrategyRollup,
};
use tape_ingestion::{BarAggregator, Normalizer};
use tracing::{debug, info};

/// Everything the pipeline derives from one batch of trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    /// Number of trades analyzed.
    pub trade_count: usize,
    /// Sum of all trade amounts.
    pub total_amount: Decimal,
    /// Gap-free, time-ordered bars.
    pub bars: Vec<Bar>,
    /// Moving averages of bar closes.
    pub overlays: Vec<Overlay>,
    /// Trades per buyer id.
    pub buyers: ParticipantCounts,
    /// Trades per seller id.
    pub sellers: ParticipantCounts,
    /// Trades per buyer strategy.
    pub buyer_strategies: StrategyRollup,
    /// Trades per seller strategy.
    pub seller_strategies: StrategyRollup,
}

/// Bar branch output.
struct BarOutput {
    bars: Vec<Bar>,
    overlays: Vec<Overlay>,
}

/// Ranking branch output.
struct RankingOutput {
    buyers: ParticipantCounts,
    sellers: ParticipantCounts,
    buyer_strategies: StrategyRollup,
    seller_strategies: StrategyRollup,
}

/// Configured analysis pipeline.
pub struct Pipeline {
    scale: ScaleConfig,
    aggregator: BarAggregator,
    labels: StrategyLabels,
    windows: Vec<usize>,
    parallel: bool,
}

impl Pipeline {
    /// Create a pipeline from a validated configuration.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scale: config.scale.clone(),
            aggregator: BarAggregator::from_config(&config.aggregation)?,
            labels: config.labels(),
            windows: config.chart.moving_average_windows.clone(),
            parallel: config.pipeline.parallel,
        })
    }

    /// Replace the strategy labels (e.g. supplied by a simulator at runtime).
    pub fn with_labels(mut self, labels: StrategyLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Replace the strategy labels in place.
    pub fn set_labels(&mut self, labels: StrategyLabels) {
        self.labels = labels;
    }

    /// Strategy labels in use.
    pub fn labels(&self) -> &StrategyLabels {
        &self.labels
    }

    /// Normalize raw records and analyze them.
    pub fn run(&self, records: &[RawTradeRecord]) -> Result<Analysis> {
        let ticks = Normalizer::from_config(&self.scale)?.normalize(records)?;
        self.analyze(&ticks)
    }

    /// Analyze already-normalized ticks.
    pub fn analyze(&self, ticks: &[NormalizedTick]) -> Result<Analysis> {
        let (bar_output, ranking) = if self.parallel {
            std::thread::scope(|s| {
                let bar_branch = s.spawn(|| self.bar_branch(ticks));
                let ranking = self.ranking_branch(ticks);
                let bar_output = bar_branch
                    .join()
                    .map_err(|_| Error::invariant("bar aggregation thread panicked"))?;
                Ok::<_, Error>((bar_output, ranking))
            })?
        } else {
            (self.bar_branch(ticks), self.ranking_branch(ticks))
        };
        let bar_output = bar_output?;
        let total_amount = ticks
            .iter()
            .try_fold(Decimal::ZERO, |acc, t| acc.checked_add(t.amount))
            .ok_or_else(|| Error::data("total amount out of range"))?;

        let analysis = Analysis {
            trade_count: ticks.len(),
            total_amount,
            bars: bar_output.bars,
            overlays: bar_output.overlays,
            buyers: ranking.buyers,
            sellers: ranking.sellers,
            buyer_strategies: ranking.buyer_strategies,
            seller_strategies: ranking.seller_strategies,
        };

        info!(
            trades = analysis.trade_count,
            bars = analysis.bars.len(),
            buyers = analysis.buyers.len(),
            sellers = analysis.sellers.len(),
            parallel = self.parallel,
            "analysis complete"
        );
        Ok(analysis)
    }

    fn bar_branch(&self, ticks: &[NormalizedTick]) -> Result<BarOutput> {
        let bars = self.aggregator.aggregate(ticks)?;
        let overlays = overlays(&bars, &self.windows);
        debug!(bars = bars.len(), overlays = overlays.len(), "bar branch done");
        Ok(BarOutput { bars, overlays })
    }

    fn ranking_branch(&self, ticks: &[NormalizedTick]) -> RankingOutput {
        let (buyers, sellers) = rank(ticks);
        let (buyer_strategies, seller_strategies) = rollup(ticks, &self.labels);
        RankingOutput {
            buyers,
            sellers,
            buyer_strategies,
            seller_strategies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tape_core::config::StrategyAssignment;
    use tape_core::UNLABELED;

    fn scenario_records() -> Vec<RawTradeRecord> {
        // Instants 0, 1, 2, 7, 8 s; prices 10, 12, 9, 15, 14
        vec![
            RawTradeRecord::new(0, 1000, dec!(1), 1, 11),
            RawTradeRecord::new(10, 1200, dec!(2), 2, 11),
            RawTradeRecord::new(20, 900, dec!(3), 1, 16),
            RawTradeRecord::new(70, 1500, dec!(4), 12, 3),
            RawTradeRecord::new(80, 1400, dec!(5), 99, 3),
        ]
    }

    fn scenario_config(parallel: bool) -> Config {
        let mut config = Config::default();
        config.pipeline.parallel = parallel;
        config.strategies = vec![
            StrategyAssignment {
                name: "RandomWalker".to_string(),
                first_id: 1,
                last_id: 10,
            },
            StrategyAssignment {
                name: "TrendFollower".to_string(),
                first_id: 11,
                last_id: 15,
            },
        ];
        config
    }

    #[test]
    fn test_full_run() {
        let pipeline = Pipeline::new(&scenario_config(false)).unwrap();
        let analysis = pipeline.run(&scenario_records()).unwrap();

        assert_eq!(analysis.trade_count, 5);
        assert_eq!(analysis.total_amount, dec!(15));
        assert_eq!(analysis.bars.len(), 2);
        assert_eq!(analysis.bars[0].volume, dec!(6));
        assert_eq!(analysis.bars[1].volume, dec!(9));
        assert_eq!(analysis.overlays.len(), 2);

        assert_eq!(analysis.buyers.top(1), vec![(1, 2)]);
        assert_eq!(analysis.sellers.get(3), 2);
        assert_eq!(analysis.buyer_strategies.get("RandomWalker"), 3);
        assert_eq!(analysis.buyer_strategies.get("TrendFollower"), 1);
        assert_eq!(analysis.buyer_strategies.get(UNLABELED), 1);
        assert_eq!(analysis.seller_strategies.get(UNLABELED), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let records = scenario_records();
        let sequential = Pipeline::new(&scenario_config(false)).unwrap().run(&records).unwrap();
        let parallel = Pipeline::new(&scenario_config(true)).unwrap().run(&records).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_with_labels_override() {
        let labels: StrategyLabels = [(99, "MarketMaker")].into_iter().collect();
        let pipeline = Pipeline::new(&Config::default()).unwrap().with_labels(labels);
        let analysis = pipeline.run(&scenario_records()).unwrap();
        assert_eq!(analysis.buyer_strategies.get("MarketMaker"), 1);
        assert_eq!(analysis.buyer_strategies.get(UNLABELED), 4);
    }

    #[test]
    fn test_empty_records() {
        let pipeline = Pipeline::new(&Config::default()).unwrap();
        let analysis = pipeline.run(&[]).unwrap();
        assert_eq!(analysis.trade_count, 0);
        assert!(analysis.bars.is_empty());
        assert!(analysis.buyers.is_empty());
    }

    #[test]
    fn test_malformed_record_aborts() {
        let mut records = scenario_records();
        records[2].amount = Some(dec!(-1));
        let err = Pipeline::new(&Config::default()).unwrap().run(&records).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { index: 2, .. }));
    }

    #[test]
    fn test_extreme_values_error_instead_of_panic() {
        let pipeline = Pipeline::new(&Config::default()).unwrap();

        // price * amount exceeds the decimal range; vwap is dropped, bar survives
        let records = vec![RawTradeRecord::new(0, i64::MAX, dec!(10000000000000), 1, 2)];
        let analysis = pipeline.run(&records).unwrap();
        assert_eq!(analysis.bars.len(), 1);
        assert_eq!(analysis.bars[0].vwap, None);

        let ticks = vec![
            NormalizedTick {
                instant: dec!(0),
                price: dec!(1),
                amount: Decimal::MAX,
                buyer_id: 1,
                seller_id: 2,
            },
            NormalizedTick {
                instant: dec!(100),
                price: dec!(1),
                amount: Decimal::MAX,
                buyer_id: 1,
                seller_id: 2,
            },
        ];
        assert!(matches!(pipeline.analyze(&ticks), Err(Error::Data(_))));
    }

    #[test]
    fn test_serializes_to_json() {
        let analysis = Pipeline::new(&Config::default())
            .unwrap()
            .run(&scenario_records())
            .unwrap();
        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(value["trade_count"], 5);
        assert_eq!(value["bars"].as_array().unwrap().len(), 2);
        assert_eq!(value["buyers"]["1"], 2);
    }
}
