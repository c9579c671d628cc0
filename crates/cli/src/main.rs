mod obs;
mod report;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tape_analytics::Pipeline;
use tape_core::Config;
use tape_ingestion::read_records_from_path;
use tracing::info;

#[derive(Parser)]
#[command(name = "tape")]
#[command(about = "Trade tape analysis: OHLCV bars and participant rankings", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  tape analyze --input trades.csv --config configs/simulation.toml\n  tape analyze --input trades.csv --bars-out bars.csv --interval 10\n  tape validate --config configs/simulation.toml\n"
)]
struct Cli {
    /// Log filter (overridden by TAPE_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build bars and rankings from a trade CSV.
    Analyze {
        /// CSV with columns timestamp, price, amount, buyer_id, seller_id.
        #[arg(long)]
        input: PathBuf,
        /// TOML configuration; defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Bucket width in seconds, overriding the config.
        #[arg(long)]
        interval: Option<Decimal>,
        /// Rows in the top buyers/sellers tables, overriding the config.
        #[arg(long)]
        top: Option<usize>,
        /// Write bars and moving averages to this CSV for charting.
        #[arg(long)]
        bars_out: Option<PathBuf>,
        /// Print the full analysis as JSON instead of the text report.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Parse and validate a configuration file.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = obs::init_tracing(&cli.log_level) {
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }

    let result = match cli.command {
        Command::Analyze {
            input,
            config,
            interval,
            top,
            bars_out,
            json,
        } => run_analyze(&input, config.as_deref(), interval, top, bars_out.as_deref(), json),
        Command::Validate { config } => run_validate(&config),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn run_analyze(
    input: &Path,
    config_path: Option<&Path>,
    interval: Option<Decimal>,
    top: Option<usize>,
    bars_out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(interval) = interval {
        config.aggregation.interval_secs = interval;
    }
    if let Some(top) = top {
        config.ranking.top_n = top;
    }

    let pipeline = Pipeline::new(&config).context("invalid configuration")?;
    let records = read_records_from_path(input)
        .with_context(|| format!("reading trades from {}", input.display()))?;
    let analysis = pipeline.run(&records)?;

    if let Some(path) = bars_out {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        report::write_bars_csv(BufWriter::new(file), &analysis)
            .with_context(|| format!("writing bars to {}", path.display()))?;
        info!(path = %path.display(), bars = analysis.bars.len(), "bars written");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print!("{}", report::format_report(&analysis, config.ranking.top_n));
    }
    Ok(())
}

fn run_validate(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    let labels = config.labels();
    println!(
        "config ok: interval={}s time_scale={} price_scale={} strategies={} labeled_ids={}",
        config.aggregation.interval_secs,
        config.scale.time_scale,
        config.scale.price_scale,
        config.strategies.len(),
        labels.len()
    );
    Ok(())
}
