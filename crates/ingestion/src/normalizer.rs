//! Raw trade record normalization.
//!
//! Converts raw integer timestamps and prices into seconds and currency
//! units, rejecting records that are incomplete or negative. Input order is
//! preserved; sorting is the aggregator's job.

use rust_decimal::Decimal;
use tape_core::config::ScaleConfig;
use tape_core::{Error, NormalizedTick, RawTradeRecord, Result, Seconds};
use tracing::debug;

/// Statistics about normalized batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationStats {
    /// Records converted.
    pub total_records: u64,
    /// Records with a zero amount (kept, contribute no volume).
    pub zero_amount_records: u64,
    /// Records whose instant is earlier than the record before them.
    pub out_of_order_records: u64,
    /// Sum of amounts.
    pub total_amount: Decimal,
}

impl NormalizationStats {
    /// Reset statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn merge(&mut self, other: &NormalizationStats) -> Result<()> {
        self.total_amount = self
            .total_amount
            .checked_add(other.total_amount)
            .ok_or_else(|| Error::data("total amount out of range"))?;
        self.total_records += other.total_records;
        self.zero_amount_records += other.zero_amount_records;
        self.out_of_order_records += other.out_of_order_records;
        Ok(())
    }
}

/// Converts raw records into normalized ticks.
pub struct Normalizer {
    /// Raw timestamp units → seconds.
    time_scale: Decimal,
    /// Raw integer price → currency units.
    price_scale: Decimal,
    /// Statistics over all successful batches.
    stats: NormalizationStats,
}

impl Normalizer {
    /// Create a normalizer with explicit scale factors. Both must be > 0.
    pub fn new(time_scale: Decimal, price_scale: Decimal) -> Result<Self> {
        Self::from_config(&ScaleConfig {
            time_scale,
            price_scale,
        })
    }

    /// Create a normalizer from configuration.
    pub fn from_config(config: &ScaleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            time_scale: config.time_scale,
            price_scale: config.price_scale,
            stats: NormalizationStats::default(),
        })
    }

    /// Convert a single record. `index` is only used for error reporting.
    pub fn normalize_record(&self, index: usize, record: &RawTradeRecord) -> Result<NormalizedTick> {
        let timestamp = required(index, "timestamp", record.timestamp)?;
        let raw_price = required(index, "price", record.price)?;
        let amount = required(index, "amount", record.amount)?;
        let buyer_id = required(index, "buyer_id", record.buyer_id)?;
        let seller_id = required(index, "seller_id", record.seller_id)?;

        if raw_price < 0 {
            return Err(Error::malformed(index, format!("negative price {raw_price}")));
        }
        if amount < Decimal::ZERO {
            return Err(Error::malformed(index, format!("negative amount {amount}")));
        }

        let instant = Decimal::from(timestamp)
            .checked_mul(self.time_scale)
            .ok_or_else(|| Error::malformed(index, "timestamp out of range"))?;
        let price = Decimal::from(raw_price)
            .checked_mul(self.price_scale)
            .ok_or_else(|| Error::malformed(index, "price out of range"))?;

        Ok(NormalizedTick {
            instant,
            price,
            amount,
            buyer_id,
            seller_id,
        })
    }

    /// Convert a batch of records, preserving input order.
    ///
    /// The first bad record aborts the whole batch.
    pub fn normalize(&mut self, records: &[RawTradeRecord]) -> Result<Vec<NormalizedTick>> {
        let mut ticks = Vec::with_capacity(records.len());
        let mut batch = NormalizationStats::default();
        let mut last_instant: Option<Seconds> = None;

        for (index, record) in records.iter().enumerate() {
            let tick = self.normalize_record(index, record)?;

            batch.total_records += 1;
            batch.total_amount = batch
                .total_amount
                .checked_add(tick.amount)
                .ok_or_else(|| Error::data(format!("total amount out of range at record {index}")))?;
            if tick.amount.is_zero() {
                batch.zero_amount_records += 1;
            }
            if last_instant.is_some_and(|prev| tick.instant < prev) {
                batch.out_of_order_records += 1;
            }
            last_instant = Some(tick.instant);

            ticks.push(tick);
        }

        debug!(
            records = batch.total_records,
            zero_amount = batch.zero_amount_records,
            out_of_order = batch.out_of_order_records,
            "normalized batch"
        );
        self.stats.merge(&batch)?;
        Ok(ticks)
    }

    /// Get normalization statistics.
    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    /// Reset statistics.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        let config = ScaleConfig::default();
        Self {
            time_scale: config.time_scale,
            price_scale: config.price_scale,
            stats: NormalizationStats::default(),
        }
    }
}

/// Normalize `records` with the given scale configuration.
pub fn normalize(records: &[RawTradeRecord], config: &ScaleConfig) -> Result<Vec<NormalizedTick>> {
    Normalizer::from_config(config)?.normalize(records)
}

fn required<T>(index: usize, field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| Error::malformed(index, format!("missing field '{field}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_record(ts: i64, price: i64, amount: Decimal) -> RawTradeRecord {
        RawTradeRecord::new(ts, price, amount, 1, 2)
    }

    #[test]
    fn test_unit_conversion() {
        let normalizer = Normalizer::default();
        let tick = normalizer
            .normalize_record(0, &make_record(125, 10050, dec!(3)))
            .unwrap();

        assert_eq!(tick.instant, dec!(12.5));
        assert_eq!(tick.price, dec!(100.50));
        assert_eq!(tick.amount, dec!(3));
        assert_eq!(tick.buyer_id, 1);
        assert_eq!(tick.seller_id, 2);
    }

    #[test]
    fn test_custom_scales() {
        let normalizer = Normalizer::new(dec!(0.001), dec!(1)).unwrap();
        let tick = normalizer
            .normalize_record(0, &make_record(1500, 42, dec!(1)))
            .unwrap();
        assert_eq!(tick.instant, dec!(1.5));
        assert_eq!(tick.price, dec!(42));
    }

    #[test]
    fn test_preserves_order() {
        let mut normalizer = Normalizer::default();
        let records = vec![
            make_record(30, 100, dec!(1)),
            make_record(10, 200, dec!(1)),
            make_record(20, 300, dec!(1)),
        ];
        let ticks = normalizer.normalize(&records).unwrap();
        let instants: Vec<_> = ticks.iter().map(|t| t.instant).collect();
        assert_eq!(instants, vec![dec!(3), dec!(1), dec!(2)]);
        assert_eq!(normalizer.stats().out_of_order_records, 1);
    }

    #[test]
    fn test_negative_price_aborts_batch() {
        let mut normalizer = Normalizer::default();
        let records = vec![make_record(0, 100, dec!(1)), make_record(1, -5, dec!(1))];
        let err = normalizer.normalize(&records).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { index: 1, .. }));
        // Failed batch leaves stats untouched
        assert_eq!(normalizer.stats().total_records, 0);
    }

    #[test]
    fn test_negative_amount() {
        let mut normalizer = Normalizer::default();
        let err = normalizer
            .normalize(&[make_record(0, 100, dec!(-0.5))])
            .unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { index: 0, .. }));
    }

    #[test]
    fn test_missing_field() {
        let mut record = make_record(0, 100, dec!(1));
        record.seller_id = None;
        let err = Normalizer::default().normalize_record(4, &record).unwrap_err();
        match err {
            Error::MalformedRecord { index, reason } => {
                assert_eq!(index, 4);
                assert!(reason.contains("seller_id"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_amount_retained() {
        let mut normalizer = Normalizer::default();
        let ticks = normalizer
            .normalize(&[make_record(0, 100, dec!(0)), make_record(1, 100, dec!(2))])
            .unwrap();
        assert_eq!(ticks.len(), 2);
        assert_eq!(normalizer.stats().zero_amount_records, 1);
        assert_eq!(normalizer.stats().total_amount, dec!(2));
    }

    #[test]
    fn test_rejects_non_positive_scales() {
        assert!(matches!(Normalizer::new(dec!(0.1), dec!(-0.01)), Err(Error::Config(_))));
        assert!(matches!(Normalizer::new(dec!(0), dec!(0.01)), Err(Error::Config(_))));

        let scale = ScaleConfig {
            time_scale: dec!(0.1),
            price_scale: dec!(-0.01),
        };
        let err = normalize(&[make_record(0, 100, dec!(1))], &scale).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_total_amount_overflow() {
        let mut normalizer = Normalizer::default();
        let records = vec![make_record(0, 100, Decimal::MAX), make_record(1, 100, Decimal::MAX)];
        assert!(matches!(normalizer.normalize(&records), Err(Error::Data(_))));
        assert_eq!(normalizer.stats().total_records, 0);
    }

    #[test]
    fn test_empty_batch() {
        let ticks = normalize(&[], &ScaleConfig::default()).unwrap();
        assert!(ticks.is_empty());
    }
}
