//! Tabular trade record source.
//!
//! Reads the `timestamp, price, amount, buyer_id, seller_id` column contract
//! from CSV. A header row is required; extra columns are ignored.

use std::fs::File;
use std::io;
use std::path::Path;
use tape_core::{Error, RawTradeRecord, Result};
use tracing::{debug, info};

/// Columns every trade file must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = ["timestamp", "price", "amount", "buyer_id", "seller_id"];

/// Read trade records from any CSV reader.
///
/// Empty cells load as missing fields (rejected later by the normalizer); a
/// non-numeric cell aborts with [`Error::MalformedRecord`] at that row's
/// 0-based index.
pub fn read_records<R: io::Read>(reader: R) -> Result<Vec<RawTradeRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(Error::data(format!("missing required column '{column}'")));
        }
    }

    let mut records = Vec::new();
    for (index, row) in rdr.deserialize::<RawTradeRecord>().enumerate() {
        records.push(row.map_err(|e| row_error(index, e))?);
    }

    debug!(records = records.len(), "read trade records");
    Ok(records)
}

/// Read trade records from a CSV file.
pub fn read_records_from_path(path: impl AsRef<Path>) -> Result<Vec<RawTradeRecord>> {
    let path = path.as_ref();
    let records = read_records(File::open(path)?)?;
    info!(path = %path.display(), records = records.len(), "loaded trades");
    Ok(records)
}

/// Write records using the same column contract.
pub fn write_records<W: io::Write>(writer: W, records: &[RawTradeRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn row_error(index: usize, e: csv::Error) -> Error {
    if let csv::ErrorKind::Deserialize { err, .. } = e.kind() {
        return Error::malformed(index, err.to_string());
    }
    Error::Csv(e)
}
