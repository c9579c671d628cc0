//! Core data types for the trade-tape system.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp in the source's raw integer unit.
pub type TimestampRaw = i64;

/// Participant (agent) identifier.
pub type ParticipantId = u64;

/// Price in decimal currency units.
pub type Price = Decimal;

/// Traded quantity.
pub type Amount = Decimal;

/// Absolute time in seconds since the Unix epoch.
pub type Seconds = Decimal;

/// Strategy key used for participants without an assigned label.
pub const UNLABELED: &str = "unlabeled";

/// Index of the fixed-width bucket containing `instant`.
///
/// Returns `None` for a non-positive interval or when the index does not fit in an i64.
#[inline]
pub fn bucket_index(instant: Seconds, interval: Seconds) -> Option<i64> {
    if interval <= Decimal::ZERO {
        return None;
    }
    instant.checked_div(interval)?.floor().to_i64()
}

/// Convert seconds since the Unix epoch to a UTC datetime.
pub fn seconds_to_utc(seconds: Seconds) -> Option<DateTime<Utc>> {
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * Decimal::from(1_000_000_000u32))
        .floor()
        .to_u32()?;
    DateTime::from_timestamp(whole.to_i64()?, nanos)
}

/// A single trade execution as read from the data source.
///
/// Fields are optional so that a missing cell reaches the normalizer, which
/// rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTradeRecord {
    /// Raw timestamp (scaled by `time_scale` to seconds).
    pub timestamp: Option<TimestampRaw>,
    /// Raw integer price (scaled by `price_scale`).
    pub price: Option<i64>,
    /// Traded amount.
    #[serde(with = "rust_decimal::serde::str_option", default)]
    pub amount: Option<Amount>,
    /// Buying participant.
    pub buyer_id: Option<ParticipantId>,
    /// Selling participant.
    pub seller_id: Option<ParticipantId>,
}

impl RawTradeRecord {
    /// Create a record with every field present.
    pub fn new(
        timestamp: TimestampRaw,
        price: i64,
        amount: Amount,
        buyer_id: ParticipantId,
        seller_id: ParticipantId,
    ) -> Self {
        Self {
            timestamp: Some(timestamp),
            price: Some(price),
            amount: Some(amount),
            buyer_id: Some(buyer_id),
            seller_id: Some(seller_id),
        }
    }
}

/// A trade after unit conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTick {
    /// Seconds since the Unix epoch.
    pub instant: Seconds,
    /// Trade price (never negative).
    pub price: Price,
    /// Trade amount (never negative, may be zero).
    pub amount: Amount,
    /// Buying participant.
    pub buyer_id: ParticipantId,
    /// Selling participant.
    pub seller_id: ParticipantId,
}

impl NormalizedTick {
    /// Instant as a UTC datetime.
    pub fn instant_utc(&self) -> Option<DateTime<Utc>> {
        seconds_to_utc(self.instant)
    }
}

/// Fixed-interval OHLCV bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// Start of the bucket (seconds since the Unix epoch).
    pub bucket_start: Seconds,
    /// Open price.
    pub open: Price,
    /// High price.
    pub high: Price,
    /// Low price.
    pub low: Price,
    /// Close price.
    pub close: Price,
    /// Total volume.
    pub volume: Amount,
    /// Volume-weighted average price, `None` when volume is zero.
    pub vwap: Option<Price>,
    /// Number of ticks in the bucket.
    pub trade_count: u32,
}

impl Bar {
    /// Gap-fill bar carrying `close` forward.
    pub fn gap(bucket_start: Seconds, close: Price) -> Self {
        Self {
            bucket_start,
            open: close,
            high: close,
            low: close,
            close,
            volume: Decimal::ZERO,
            vwap: None,
            trade_count: 0,
        }
    }

    /// Whether this bar was synthesized for a bucket without ticks.
    #[inline]
    pub fn is_gap(&self) -> bool {
        self.trade_count == 0
    }

    /// Bucket start as a UTC datetime.
    pub fn bucket_start_utc(&self) -> Option<DateTime<Utc>> {
        seconds_to_utc(self.bucket_start)
    }
}

/// Trade counts per participant (one side of the book).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantCounts {
    counts: BTreeMap<ParticipantId, u64>,
}

impl ParticipantCounts {
    /// Create empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one trade for `id`.
    pub fn record(&mut self, id: ParticipantId) {
        *self.counts.entry(id).or_insert(0) += 1;
    }

    /// Trades counted for `id` (0 if never seen).
    pub fn get(&self, id: ParticipantId) -> u64 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Number of distinct participants.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Iterate in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ParticipantId, u64)> + '_ {
        self.counts.iter().map(|(&id, &n)| (id, n))
    }

    /// The `n` most active participants: descending count, ties by ascending id.
    pub fn top(&self, n: usize) -> Vec<(ParticipantId, u64)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

/// Strategy assignment for participants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyLabels {
    labels: BTreeMap<ParticipantId, String>,
}

impl StrategyLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `strategy` to a single participant, replacing any previous label.
    pub fn insert(&mut self, id: ParticipantId, strategy: impl Into<String>) {
        self.labels.insert(id, strategy.into());
    }

    /// Assign `strategy` to every id in `first..=last`.
    pub fn assign_range(&mut self, first: ParticipantId, last: ParticipantId, strategy: &str) {
        for id in first..=last {
            self.labels.insert(id, strategy.to_string());
        }
    }

    /// Explicit label for `id`, if any.
    pub fn get(&self, id: ParticipantId) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    /// Label for `id`, or [`UNLABELED`].
    pub fn label_of(&self, id: ParticipantId) -> &str {
        self.get(id).unwrap_or(UNLABELED)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(ParticipantId, S)> for StrategyLabels {
    fn from_iter<I: IntoIterator<Item = (ParticipantId, S)>>(iter: I) -> Self {
        let mut labels = Self::new();
        for (id, strategy) in iter {
            labels.insert(id, strategy);
        }
        labels
    }
}

/// Trade counts per strategy (one side of the book).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyRollup {
    counts: BTreeMap<String, u64>,
}

impl StrategyRollup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one trade for `strategy`.
    pub fn record(&mut self, strategy: &str) {
        match self.counts.get_mut(strategy) {
            Some(n) => *n += 1,
            None => {
                self.counts.insert(strategy.to_string(), 1);
            }
        }
    }

    /// Trades counted for `strategy` (0 if never seen).
    pub fn get(&self, strategy: &str) -> u64 {
        self.counts.get(strategy).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Strategies by descending count, ties by ascending name.
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<_> = self.counts.iter().map(|(s, &n)| (s.as_str(), n)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked
    }
}
