//! Result rendering
//!
//! Human-readable report for stdout and the flat JSON export.

use std::fs;
use std::path::Path;

use crate::models::ResultSummary;
use crate::{BenchError, Result};

/// Two-section human report
pub fn render_text(summary: &ResultSummary) -> String {
    let r = summary.to_record();
    format!(
        "Written {written} MB in {wt:.4} s\n\
         Write speed is  {ws:.2} MB/s\n  \
         max: {wmax:.2}, min: {wmin:.2}\n\
         \n\
         Read {blocks} x {bs} B blocks in {rt:.4} s\n\
         Read speed is  {rs:.2} MB/s\n  \
         max: {rmax:.2}, min: {rmin:.2}\n",
        written = r.written_mb,
        wt = r.write_time,
        ws = r.write_speed,
        wmax = r.write_speed_max,
        wmin = r.write_speed_min,
        blocks = r.read_blocks,
        bs = r.block_size,
        rt = r.read_time,
        rs = r.read_speed,
        rmax = r.read_speed_max,
        rmin = r.read_speed_min,
    )
}

/// Serialize the flat record as pretty JSON
pub fn to_json(summary: &ResultSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(&summary.to_record())?)
}

/// Write the JSON record to `path`, replacing any existing file
///
/// The record is written to a sibling temp file first, so a failed write
/// never leaves partial JSON at `path`.
pub fn write_json(path: &Path, summary: &ResultSummary) -> Result<()> {
    let content = to_json(summary)?;

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = Path::new(&staging);

    fs::write(staging, content.as_bytes()).map_err(|e| {
        BenchError::PersistenceError(format!("Failed to write {}: {}", staging.display(), e))
    })?;

    fs::rename(staging, path).map_err(|e| {
        let _ = fs::remove_file(staging);
        BenchError::PersistenceError(format!("Failed to write {}: {}", path.display(), e))
    })?;

    tracing::debug!(path = %path.display(), "Results written");
    Ok(())
}
