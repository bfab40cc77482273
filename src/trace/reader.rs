use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::info;

use crate::error::{Error, Result};

use super::record::TraceRecord;

/// Aggregates from a first pass over the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceStats {
    pub host_count: usize,
    pub disk_size: u64,
    pub records: u64,
}

/// Autodetected disk sizes never go below 1 GiB.
const MIN_DISK_SIZE: u64 = 1024 * 1024 * 1024;

/// Runs `f` for every record, in file order, up to `limit` records.
pub fn for_each_record(
    path: &Path,
    limit: Option<u64>,
    mut f: impl FnMut(TraceRecord) -> Result<()>,
) -> Result<()> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut line: u64 = 0;
    for record in reader.records() {
        line += 1;
        if let Some(limit) = limit
            && line > limit
        {
            break;
        }
        let record = record.map_err(|e| Error::TraceMalformed {
            line,
            reason: e.to_string(),
        })?;
        f(TraceRecord::parse(line, &record)?)?;
    }
    Ok(())
}

/// First pass: host count and minimum disk size from the trace itself.
pub fn scan(path: &Path, limit: Option<u64>) -> Result<TraceStats> {
    let mut stats = TraceStats {
        host_count: 1,
        disk_size: MIN_DISK_SIZE,
        records: 0,
    };
    for_each_record(path, limit, |record| {
        stats.host_count = stats.host_count.max(record.asu + 1);
        stats.disk_size = stats.disk_size.max(record.lba + record.size);
        stats.records += 1;
        Ok(())
    })?;
    info!(
        hosts = stats.host_count,
        disk_size = stats.disk_size,
        records = stats.records,
        "scanned trace"
    );
    Ok(stats)
}
