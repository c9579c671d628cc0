use rust_decimal::Decimal;
use tape_analytics::{rank, rollup};
use tape_core::{NormalizedTick, StrategyLabels, UNLABELED};

fn make_ticks() -> Vec<NormalizedTick> {
    (0u64..60)
        .map(|i| NormalizedTick {
            instant: Decimal::from(i),
            price: Decimal::ONE,
            amount: Decimal::ONE,
            buyer_id: (i * 7) % 23 + 1,
            seller_id: (i * 11) % 19 + 1,
        })
        .collect()
}

fn labels() -> StrategyLabels {
    let mut labels = StrategyLabels::new();
    labels.assign_range(1, 10, "RandomWalker");
    labels.assign_range(11, 15, "TrendFollower");
    labels.assign_range(16, 20, "MeanReverter");
    labels
}

#[test]
fn test_rank_and_rollup_ignore_order() {
    let ticks = make_ticks();
    let labels = labels();
    let expected_rank = rank(&ticks);
    let expected_rollup = rollup(&ticks, &labels);

    let mut reversed = ticks.clone();
    reversed.reverse();

    let mut rotated = ticks.clone();
    rotated.rotate_left(17);

    // Interleave odd and even positions
    let interleaved: Vec<_> = ticks
        .iter()
        .step_by(2)
        .chain(ticks.iter().skip(1).step_by(2))
        .cloned()
        .collect();

    for permuted in [reversed, rotated, interleaved] {
        assert_eq!(rank(&permuted), expected_rank);
        assert_eq!(rollup(&permuted, &labels), expected_rollup);
    }
}

#[test]
fn test_counts_cover_every_trade() {
    let ticks = make_ticks();
    let (buyers, sellers) = rank(&ticks);
    let (buyer_rollup, seller_rollup) = rollup(&ticks, &labels());

    assert_eq!(buyers.total(), ticks.len() as u64);
    assert_eq!(sellers.total(), ticks.len() as u64);
    assert_eq!(buyer_rollup.total(), ticks.len() as u64);
    assert_eq!(seller_rollup.total(), ticks.len() as u64);
    // Buyer ids reach 23, beyond the labeled population
    assert!(buyer_rollup.get(UNLABELED) > 0);
    assert_eq!(seller_rollup.get(UNLABELED), 0);
}
