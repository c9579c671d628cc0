//! Text report and bar export for the analyze command.

use std::fmt::Write as _;
use std::io;
use tape_analytics::Analysis;
use tape_core::{ParticipantCounts, StrategyRollup};

/// Human-readable summary: trade count, top buyers/sellers, strategy rollups.
pub fn format_report(analysis: &Analysis, top_n: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Loaded {} trades.", analysis.trade_count);
    let _ = writeln!(
        out,
        "Built {} bars ({} gap-filled), total volume {}.",
        analysis.bars.len(),
        analysis.bars.iter().filter(|b| b.is_gap()).count(),
        analysis.total_amount
    );

    let _ = writeln!(out, "\n--- Top Buyers ---");
    write_counts(&mut out, "buyer_id", &analysis.buyers, top_n);
    let _ = writeln!(out, "\n--- Top Sellers ---");
    write_counts(&mut out, "seller_id", &analysis.sellers, top_n);

    let _ = writeln!(out, "\n--- Agent Strategy Performance ---");
    let _ = writeln!(out, "Trades by Buyer Strategy:");
    write_rollup(&mut out, &analysis.buyer_strategies);
    let _ = writeln!(out, "\nTrades by Seller Strategy:");
    write_rollup(&mut out, &analysis.seller_strategies);
    out
}

fn write_counts(out: &mut String, header: &str, counts: &ParticipantCounts, top_n: usize) {
    let _ = writeln!(out, "{header:<12}{:>8}", "trades");
    for (id, n) in counts.top(top_n) {
        let _ = writeln!(out, "{id:<12}{n:>8}");
    }
}

fn write_rollup(out: &mut String, rollup: &StrategyRollup) {
    for (strategy, n) in rollup.ranked() {
        let _ = writeln!(out, "{strategy:<16}{n:>8}");
    }
}

/// Write bars plus one `sma_<window>` column per overlay, for a chart renderer.
pub fn write_bars_csv<W: io::Write>(writer: W, analysis: &Analysis) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = [
        "bucket_start",
        "time_utc",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "trade_count",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(analysis.overlays.iter().map(|o| format!("sma_{}", o.window)));
    wtr.write_record(&header)?;

    for (i, bar) in analysis.bars.iter().enumerate() {
        let mut row = vec![
            bar.bucket_start.to_string(),
            bar.bucket_start_utc().map(|t| t.to_rfc3339()).unwrap_or_default(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
            bar.trade_count.to_string(),
        ];
        for overlay in &analysis.overlays {
            let value = overlay.values.get(i).copied().flatten();
            row.push(value.map(|v| v.round_dp(6).normalize().to_string()).unwrap_or_default());
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tape_analytics::Pipeline;
    use tape_core::{Config, RawTradeRecord};

    fn sample_analysis() -> Analysis {
        let mut config = Config::default();
        config.chart.moving_average_windows = vec![2];
        let records = vec![
            RawTradeRecord::new(0, 1000, dec!(1), 1, 11),
            RawTradeRecord::new(10, 1200, dec!(2), 2, 11),
            RawTradeRecord::new(120, 1100, dec!(3), 1, 12),
        ];
        Pipeline::new(&config).unwrap().run(&records).unwrap()
    }

    #[test]
    fn test_report_sections() {
        let text = format_report(&sample_analysis(), 5);
        assert!(text.starts_with("Loaded 3 trades."));
        assert!(text.contains("(1 gap-filled)"));
        assert!(text.contains("--- Top Buyers ---"));
        assert!(text.contains("--- Top Sellers ---"));
        assert!(text.contains("Trades by Buyer Strategy:"));
        // No labels configured: every trade is unlabeled
        assert!(text.contains("unlabeled"));
    }

    #[test]
    fn test_report_top_n() {
        let text = format_report(&sample_analysis(), 1);
        let buyers = text
            .split("--- Top Buyers ---")
            .nth(1)
            .and_then(|s| s.split("--- Top Sellers ---").next())
            .unwrap();
        // header + one row
        assert_eq!(buyers.lines().filter(|l| !l.trim().is_empty()).count(), 2);
        assert!(buyers.contains("1 "));
    }

    #[test]
    fn test_bars_csv() {
        let mut buf = Vec::new();
        write_bars_csv(&mut buf, &sample_analysis()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "bucket_start,time_utc,open,high,low,close,volume,trade_count,sma_2"
        );
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("0,1970-01-01T00:00:00+00:00,10.00,12.00,10.00,12.00,3,2,"));
        // Gap bar carries the close forward; 2-bucket average of 12 and 12
        assert!(lines[2].starts_with("5,"));
        assert!(lines[2].ends_with(",0,0,12"));
    }
}
