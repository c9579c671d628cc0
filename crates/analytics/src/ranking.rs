//! Participant activity ranking.
//!
//! Counts trades per buyer and seller, and rolls those counts up to the
//! strategies participants are labeled with. Independent of bar interval.

use tape_core::{NormalizedTick, ParticipantCounts, StrategyLabels, StrategyRollup};

/// Trades per buyer id and per seller id.
pub fn rank(ticks: &[NormalizedTick]) -> (ParticipantCounts, ParticipantCounts) {
    let mut buyers = ParticipantCounts::new();
    let mut sellers = ParticipantCounts::new();
    for tick in ticks {
        buyers.record(tick.buyer_id);
        sellers.record(tick.seller_id);
    }
    (buyers, sellers)
}

/// Trades per buyer strategy and per seller strategy.
///
/// Participants missing from `labels` are counted under
/// [`tape_core::UNLABELED`].
pub fn rollup(ticks: &[NormalizedTick], labels: &StrategyLabels) -> (StrategyRollup, StrategyRollup) {
    let mut buyers = StrategyRollup::new();
    let mut sellers = StrategyRollup::new();
    for tick in ticks {
        buyers.record(labels.label_of(tick.buyer_id));
        sellers.record(labels.label_of(tick.seller_id));
    }
    (buyers, sellers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tape_core::UNLABELED;

    fn make_tick(buyer_id: u64, seller_id: u64) -> NormalizedTick {
        NormalizedTick {
            instant: Decimal::ZERO,
            price: Decimal::ONE,
            amount: Decimal::ONE,
            buyer_id,
            seller_id,
        }
    }

    #[test]
    fn test_rank_counts() {
        let ticks = vec![make_tick(1, 11), make_tick(1, 12), make_tick(2, 11), make_tick(1, 16)];
        let (buyers, sellers) = rank(&ticks);

        assert_eq!(buyers.get(1), 3);
        assert_eq!(buyers.get(2), 1);
        assert_eq!(sellers.get(11), 2);
        assert_eq!(sellers.len(), 3);
        assert_eq!(buyers.top(1), vec![(1, 3)]);
        // 12 and 16 tie at one trade; lower id first
        assert_eq!(sellers.top(3), vec![(11, 2), (12, 1), (16, 1)]);
    }

    #[test]
    fn test_rollup_with_labels() {
        let mut labels = StrategyLabels::new();
        labels.assign_range(1, 10, "RandomWalker");
        labels.assign_range(11, 15, "TrendFollower");
        labels.assign_range(16, 20, "MeanReverter");

        let ticks = vec![make_tick(1, 11), make_tick(12, 16), make_tick(3, 17)];
        let (buyers, sellers) = rollup(&ticks, &labels);

        assert_eq!(buyers.get("RandomWalker"), 2);
        assert_eq!(buyers.get("TrendFollower"), 1);
        assert_eq!(sellers.get("MeanReverter"), 2);
        assert_eq!(sellers.get("TrendFollower"), 1);
        assert_eq!(buyers.get(UNLABELED), 0);
    }

    #[test]
    fn test_unlabeled_fallback() {
        let labels: StrategyLabels = [(1, "A")].into_iter().collect();
        let (buyers, sellers) = rollup(&[make_tick(2, 1)], &labels);

        assert_eq!(buyers.get(UNLABELED), 1);
        assert_eq!(buyers.len(), 1);
        assert_eq!(sellers.get("A"), 1);
    }

    #[test]
    fn test_empty_ticks() {
        let (buyers, sellers) = rank(&[]);
        assert!(buyers.is_empty() && sellers.is_empty());
        let (buyers, _) = rollup(&[], &StrategyLabels::new());
        assert!(buyers.is_empty());
    }
}
