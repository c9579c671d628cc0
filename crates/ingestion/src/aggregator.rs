//! Fixed-interval bar aggregation from normalized ticks.
//!
//! Buckets ticks into half-open intervals of a configurable width and emits
//! one OHLCV bar per bucket between the first and last tick, filling buckets
//! without ticks from the previous close.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tape_core::config::AggregationConfig;
use tape_core::{bucket_index, Bar, Error, NormalizedTick, Price, Result, Seconds};
use tracing::debug;

/// Upper bound on the bars one `aggregate` call may emit, gap bars included.
pub const MAX_BARS: i64 = 10_000_000;

/// Aggregates normalized ticks into fixed-interval bars.
#[derive(Debug, Clone)]
pub struct BarAggregator {
    /// Bucket width in seconds (always > 0).
    interval: Seconds,
}

/// A bucket that's currently being filled.
#[derive(Debug, Clone)]
struct BarInProgress {
    bucket_start: Seconds,
    open: Option<Price>,
    high: Price,
    low: Price,
    close: Price,
    volume: Decimal,
    /// `None` once sum(price * amount) leaves the representable range.
    vwap_numerator: Option<Decimal>,
    trade_count: u32,
}

impl BarInProgress {
    fn new(bucket_start: Seconds) -> Self {
        Self {
            bucket_start,
            open: None,
            high: Decimal::MIN,
            low: Decimal::MAX,
            close: Decimal::ZERO,
            volume: Decimal::ZERO,
            vwap_numerator: Some(Decimal::ZERO),
            trade_count: 0,
        }
    }

    fn add_tick(&mut self, price: Price, amount: Decimal) -> Result<()> {
        self.volume = self.volume.checked_add(amount).ok_or_else(|| {
            Error::data(format!("bucket at {} volume out of range", self.bucket_start))
        })?;
        self.vwap_numerator = self
            .vwap_numerator
            .and_then(|n| price.checked_mul(amount).and_then(|pv| n.checked_add(pv)));
        if self.open.is_none() {
            self.open = Some(price);
        }
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.trade_count += 1;
        Ok(())
    }

    fn vwap(&self) -> Option<Price> {
        if self.volume > Decimal::ZERO {
            self.vwap_numerator?.checked_div(self.volume)
        } else {
            None
        }
    }

    fn to_bar(&self) -> Option<Bar> {
        let open = self.open?;

        Some(Bar {
            bucket_start: self.bucket_start,
            open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            vwap: self.vwap(),
            trade_count: self.trade_count,
        })
    }
}

impl BarAggregator {
    /// Create an aggregator with the given bucket width in seconds.
    pub fn new(interval: Seconds) -> Result<Self> {
        if interval <= Decimal::ZERO {
            return Err(Error::config(format!("bar interval must be > 0, got {interval}")));
        }
        Ok(Self { interval })
    }

    /// Create an aggregator from configuration.
    pub fn from_config(config: &AggregationConfig) -> Result<Self> {
        Self::new(config.interval_secs)
    }

    /// Bucket width in seconds.
    pub fn interval(&self) -> Seconds {
        self.interval
    }

    /// Aggregate ticks into a gap-free, time-ordered bar sequence.
    ///
    /// Ticks may arrive in any order; they are stably sorted by instant first,
    /// so ticks sharing an instant keep their input order. Empty input yields
    /// no bars.
    pub fn aggregate(&self, ticks: &[NormalizedTick]) -> Result<Vec<Bar>> {
        if ticks.is_empty() {
            return Ok(Vec::new());
        }

        let mut sorted: Vec<&NormalizedTick> = ticks.iter().collect();
        sorted.sort_by(|a, b| a.instant.cmp(&b.instant));

        let mut buckets: BTreeMap<i64, BarInProgress> = BTreeMap::new();
        for tick in &sorted {
            let index = self.bucket_of(tick.instant)?;
            let bucket_start = self.bucket_start(index)?;
            buckets
                .entry(index)
                .or_insert_with(|| BarInProgress::new(bucket_start))
                .add_tick(tick.price, tick.amount)?;
        }

        let (first, last) = match (buckets.keys().next(), buckets.keys().next_back()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Err(Error::invariant("ticks present but no bucket was filled")),
        };

        let span = last
            .checked_sub(first)
            .and_then(|d| d.checked_add(1))
            .filter(|&n| n <= MAX_BARS)
            .ok_or_else(|| {
                Error::data(format!(
                    "ticks span buckets {first}..={last}, more than {MAX_BARS} bars"
                ))
            })?;

        let mut bars = Vec::with_capacity(span as usize);
        let mut prev_close: Option<Price> = None;
        let mut gaps = 0usize;

        for index in first..=last {
            let bar = match buckets.get(&index).and_then(BarInProgress::to_bar) {
                Some(bar) => bar,
                None => {
                    let close = prev_close.ok_or_else(|| {
                        Error::invariant(format!("bucket {index} has no ticks and no previous close"))
                    })?;
                    gaps += 1;
                    Bar::gap(self.bucket_start(index)?, close)
                }
            };
            prev_close = Some(bar.close);
            bars.push(bar);
        }

        debug!(
            ticks = ticks.len(),
            bars = bars.len(),
            gaps,
            interval = %self.interval,
            "aggregated bars"
        );

        Ok(bars)
    }

    fn bucket_of(&self, instant: Seconds) -> Result<i64> {
        bucket_index(instant, self.interval)
            .ok_or_else(|| Error::data(format!("instant {instant} has no representable bucket")))
    }

    fn bucket_start(&self, index: i64) -> Result<Seconds> {
        Decimal::from(index)
            .checked_mul(self.interval)
            .ok_or_else(|| Error::data(format!("bucket {index} start out of range")))
    }
}

impl Default for BarAggregator {
    fn default() -> Self {
        Self {
            interval: AggregationConfig::default().interval_secs,
        }
    }
}

/// Aggregate `ticks` into bars of width `interval` seconds.
pub fn aggregate(ticks: &[NormalizedTick], interval: Seconds) -> Result<Vec<Bar>> {
    BarAggregator::new(interval)?.aggregate(ticks)
}
