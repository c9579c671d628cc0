//! PyO3 bindings for trade-tape Rust components.
//!
//! Exposes the analysis core to Python so a charting sink can consume bars
//! directly:
//! - Record normalization
//! - Bar aggregation with gap filling
//! - Participant ranking and strategy rollups
//! - Moving-average overlays
//! - The end-to-end pipeline

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use tape_analytics::{
    Analysis as RustAnalysis, MovingAverage, Pipeline as RustPipeline,
};
use tape_core::config::ScaleConfig;
use tape_core::{
    Bar as RustBar, Config as RustConfig, Error as RustError, NormalizedTick as RustTick,
    RawTradeRecord as RustRawTradeRecord, StrategyLabels, StrategyRollup,
};
use tape_ingestion::{read_records_from_path, BarAggregator, Normalizer};

// ============================================================================
// Conversions
// ============================================================================

fn to_py_err(err: RustError) -> PyErr {
    match err {
        RustError::Io(e) => PyIOError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn to_decimal(value: f64) -> PyResult<Decimal> {
    if !value.is_finite() {
        return Err(PyValueError::new_err(format!("not a finite number: {value}")));
    }
    Decimal::from_str(&value.to_string())
        .map_err(|e| PyValueError::new_err(format!("{value}: {e}")))
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

fn rollup_to_map(rollup: &StrategyRollup) -> HashMap<String, u64> {
    rollup
        .ranked()
        .into_iter()
        .map(|(strategy, n)| (strategy.to_string(), n))
        .collect()
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// A raw trade record; fields may be missing.
#[pyclass]
#[derive(Clone)]
pub struct RawTradeRecord {
    #[pyo3(get, set)]
    pub timestamp: Option<i64>,
    #[pyo3(get, set)]
    pub price: Option<i64>,
    #[pyo3(get, set)]
    pub amount: Option<f64>,
    #[pyo3(get, set)]
    pub buyer_id: Option<u64>,
    #[pyo3(get, set)]
    pub seller_id: Option<u64>,
}

#[pymethods]
impl RawTradeRecord {
    #[new]
    #[pyo3(signature = (timestamp=None, price=None, amount=None, buyer_id=None, seller_id=None))]
    fn new(
        timestamp: Option<i64>,
        price: Option<i64>,
        amount: Option<f64>,
        buyer_id: Option<u64>,
        seller_id: Option<u64>,
    ) -> Self {
        RawTradeRecord {
            timestamp,
            price,
            amount,
            buyer_id,
            seller_id,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "RawTradeRecord(timestamp={:?}, price={:?}, amount={:?}, buyer_id={:?}, seller_id={:?})",
            self.timestamp, self.price, self.amount, self.buyer_id, self.seller_id
        )
    }
}

impl RawTradeRecord {
    fn to_rust(&self) -> PyResult<RustRawTradeRecord> {
        Ok(RustRawTradeRecord {
            timestamp: self.timestamp,
            price: self.price,
            amount: self.amount.map(to_decimal).transpose()?,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
        })
    }
}

/// A normalized tick.
#[pyclass]
#[derive(Clone)]
pub struct Tick {
    #[pyo3(get, set)]
    pub instant: f64,
    #[pyo3(get, set)]
    pub price: f64,
    #[pyo3(get, set)]
    pub amount: f64,
    #[pyo3(get, set)]
    pub buyer_id: u64,
    #[pyo3(get, set)]
    pub seller_id: u64,
}

#[pymethods]
impl Tick {
    #[new]
    fn new(instant: f64, price: f64, amount: f64, buyer_id: u64, seller_id: u64) -> Self {
        Tick {
            instant,
            price,
            amount,
            buyer_id,
            seller_id,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Tick(instant={}, price={}, amount={}, buyer_id={}, seller_id={})",
            self.instant, self.price, self.amount, self.buyer_id, self.seller_id
        )
    }
}

impl Tick {
    fn to_rust(&self) -> PyResult<RustTick> {
        Ok(RustTick {
            instant: to_decimal(self.instant)?,
            price: to_decimal(self.price)?,
            amount: to_decimal(self.amount)?,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
        })
    }
}

impl From<&RustTick> for Tick {
    fn from(t: &RustTick) -> Self {
        Tick {
            instant: to_f64(t.instant),
            price: to_f64(t.price),
            amount: to_f64(t.amount),
            buyer_id: t.buyer_id,
            seller_id: t.seller_id,
        }
    }
}

fn ticks_to_rust(ticks: &[Tick]) -> PyResult<Vec<RustTick>> {
    ticks.iter().map(Tick::to_rust).collect()
}

/// Fixed-interval OHLCV bar.
#[pyclass]
#[derive(Clone)]
pub struct Bar {
    #[pyo3(get)]
    pub bucket_start: f64,
    #[pyo3(get)]
    pub open: f64,
    #[pyo3(get)]
    pub high: f64,
    #[pyo3(get)]
    pub low: f64,
    #[pyo3(get)]
    pub close: f64,
    #[pyo3(get)]
    pub volume: f64,
    #[pyo3(get)]
    pub vwap: Option<f64>,
    #[pyo3(get)]
    pub trade_count: u32,
}

#[pymethods]
impl Bar {
    /// Whether the bar was synthesized for a bucket without trades.
    fn is_gap(&self) -> bool {
        self.trade_count == 0
    }

    fn __repr__(&self) -> String {
        format!(
            "Bar(bucket_start={}, open={}, high={}, low={}, close={}, volume={}, trade_count={})",
            self.bucket_start, self.open, self.high, self.low, self.close, self.volume, self.trade_count
        )
    }
}

impl From<&RustBar> for Bar {
    fn from(b: &RustBar) -> Self {
        Bar {
            bucket_start: to_f64(b.bucket_start),
            open: to_f64(b.open),
            high: to_f64(b.high),
            low: to_f64(b.low),
            close: to_f64(b.close),
            volume: to_f64(b.volume),
            vwap: b.vwap.map(to_f64),
            trade_count: b.trade_count,
        }
    }
}

/// Result of a pipeline run.
#[pyclass]
pub struct Analysis {
    #[pyo3(get)]
    pub trade_count: usize,
    #[pyo3(get)]
    pub total_amount: f64,
    #[pyo3(get)]
    pub bars: Vec<Bar>,
    /// Moving averages keyed by window.
    #[pyo3(get)]
    pub overlays: HashMap<usize, Vec<Option<f64>>>,
    #[pyo3(get)]
    pub buyers: HashMap<u64, u64>,
    #[pyo3(get)]
    pub sellers: HashMap<u64, u64>,
    #[pyo3(get)]
    pub buyer_strategies: HashMap<String, u64>,
    #[pyo3(get)]
    pub seller_strategies: HashMap<String, u64>,
    top_buyers: Vec<(u64, u64)>,
    top_sellers: Vec<(u64, u64)>,
}

#[pymethods]
impl Analysis {
    /// Most active buyers: descending count, ties by ascending id.
    #[pyo3(signature = (n=5))]
    fn top_buyers(&self, n: usize) -> Vec<(u64, u64)> {
        self.top_buyers.iter().take(n).copied().collect()
    }

    /// Most active sellers: descending count, ties by ascending id.
    #[pyo3(signature = (n=5))]
    fn top_sellers(&self, n: usize) -> Vec<(u64, u64)> {
        self.top_sellers.iter().take(n).copied().collect()
    }

    fn __repr__(&self) -> String {
        format!("Analysis(trade_count={}, bars={})", self.trade_count, self.bars.len())
    }
}

impl From<RustAnalysis> for Analysis {
    fn from(a: RustAnalysis) -> Self {
        Analysis {
            trade_count: a.trade_count,
            total_amount: to_f64(a.total_amount),
            bars: a.bars.iter().map(Bar::from).collect(),
            overlays: a
                .overlays
                .iter()
                .map(|o| (o.window, o.values.iter().map(|v| v.map(to_f64)).collect()))
                .collect(),
            buyers: a.buyers.iter().collect(),
            sellers: a.sellers.iter().collect(),
            buyer_strategies: rollup_to_map(&a.buyer_strategies),
            seller_strategies: rollup_to_map(&a.seller_strategies),
            top_buyers: a.buyers.top(a.buyers.len()),
            top_sellers: a.sellers.top(a.sellers.len()),
        }
    }
}

// ============================================================================
// Python-exposed Functions
// ============================================================================

/// Normalize raw records into ticks, preserving input order.
#[pyfunction]
#[pyo3(name = "normalize", signature = (records, time_scale=0.1, price_scale=0.01))]
fn py_normalize(records: Vec<RawTradeRecord>, time_scale: f64, price_scale: f64) -> PyResult<Vec<Tick>> {
    let scale = ScaleConfig {
        time_scale: to_decimal(time_scale)?,
        price_scale: to_decimal(price_scale)?,
    };
    let mut normalizer = Normalizer::from_config(&scale).map_err(to_py_err)?;
    let rust_records = records
        .iter()
        .map(RawTradeRecord::to_rust)
        .collect::<PyResult<Vec<_>>>()?;
    let ticks = normalizer.normalize(&rust_records).map_err(to_py_err)?;
    Ok(ticks.iter().map(Tick::from).collect())
}

/// Aggregate ticks into gap-free bars of `interval` seconds.
#[pyfunction]
#[pyo3(name = "aggregate", signature = (ticks, interval=5.0))]
fn py_aggregate(ticks: Vec<Tick>, interval: f64) -> PyResult<Vec<Bar>> {
    let aggregator = BarAggregator::new(to_decimal(interval)?).map_err(to_py_err)?;
    let bars = aggregator.aggregate(&ticks_to_rust(&ticks)?).map_err(to_py_err)?;
    Ok(bars.iter().map(Bar::from).collect())
}

/// Trades per buyer id and per seller id.
#[pyfunction]
#[pyo3(name = "rank")]
fn py_rank(ticks: Vec<Tick>) -> PyResult<(HashMap<u64, u64>, HashMap<u64, u64>)> {
    let (buyers, sellers) = tape_analytics::rank(&ticks_to_rust(&ticks)?);
    Ok((buyers.iter().collect(), sellers.iter().collect()))
}

/// Trades per buyer strategy and per seller strategy.
#[pyfunction]
#[pyo3(name = "rollup")]
fn py_rollup(
    ticks: Vec<Tick>,
    labels: HashMap<u64, String>,
) -> PyResult<(HashMap<String, u64>, HashMap<String, u64>)> {
    let labels: StrategyLabels = labels.into_iter().collect();
    let (buyers, sellers) = tape_analytics::rollup(&ticks_to_rust(&ticks)?, &labels);
    Ok((rollup_to_map(&buyers), rollup_to_map(&sellers)))
}

/// Simple moving average of bar closes; `None` until the window fills.
#[pyfunction]
#[pyo3(name = "moving_average")]
fn py_moving_average(bars: Vec<Bar>, window: usize) -> PyResult<Vec<Option<f64>>> {
    if window == 0 {
        return Err(PyValueError::new_err("window must be > 0"));
    }
    let mut ma = MovingAverage::new(window);
    bars.iter()
        .map(|bar| -> PyResult<Option<f64>> { Ok(ma.push(to_decimal(bar.close)?).map(to_f64)) })
        .collect()
}

// ============================================================================
// Python-exposed Pipeline
// ============================================================================

/// Configured analysis pipeline.
#[pyclass(name = "Pipeline")]
pub struct PyPipeline {
    inner: RustPipeline,
}

#[pymethods]
impl PyPipeline {
    /// Create from a TOML config file, or defaults when omitted.
    #[new]
    #[pyo3(signature = (config_path=None))]
    fn new(config_path: Option<String>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => RustConfig::load(path).map_err(to_py_err)?,
            None => RustConfig::default(),
        };
        let inner = RustPipeline::new(&config).map_err(to_py_err)?;
        Ok(PyPipeline { inner })
    }

    /// Replace strategy labels.
    fn set_labels(&mut self, labels: HashMap<u64, String>) {
        self.inner.set_labels(labels.into_iter().collect());
    }

    /// Analyze raw records.
    fn run(&self, records: Vec<RawTradeRecord>) -> PyResult<Analysis> {
        let rust_records = records
            .iter()
            .map(RawTradeRecord::to_rust)
            .collect::<PyResult<Vec<_>>>()?;
        Ok(self.inner.run(&rust_records).map_err(to_py_err)?.into())
    }

    /// Load a trade CSV and analyze it.
    fn analyze_csv(&self, path: String) -> PyResult<Analysis> {
        let records = read_records_from_path(path).map_err(to_py_err)?;
        Ok(self.inner.run(&records).map_err(to_py_err)?.into())
    }
}

/// Load a trade CSV and analyze it with an optional TOML config.
#[pyfunction]
#[pyo3(signature = (path, config_path=None))]
fn analyze_csv(path: String, config_path: Option<String>) -> PyResult<Analysis> {
    PyPipeline::new(config_path)?.analyze_csv(path)
}

// ============================================================================
// Module Definition
// ============================================================================

/// Trade Tape - tick-to-bar aggregation and participant ranking for Python.
#[pymodule]
fn trade_tape(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<RawTradeRecord>()?;
    m.add_class::<Tick>()?;
    m.add_class::<Bar>()?;
    m.add_class::<Analysis>()?;

    // Engine classes
    m.add_class::<PyPipeline>()?;

    // Functions
    m.add_function(wrap_pyfunction!(py_normalize, m)?)?;
    m.add_function(wrap_pyfunction!(py_aggregate, m)?)?;
    m.add_function(wrap_pyfunction!(py_rank, m)?)?;
    m.add_function(wrap_pyfunction!(py_rollup, m)?)?;
    m.add_function(wrap_pyfunction!(py_moving_average, m)?)?;
    m.add_function(wrap_pyfunction!(analyze_csv, m)?)?;

    Ok(())
}
