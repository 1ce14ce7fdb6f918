//! # Block log
//!
//! An append-only, newline-delimited record store on disk. Each line is
//! `{"hash": "...", "block": {...}}`. The log is read twice over its
//! lifetime by different callers: state replay scans from the empty hash
//! (the whole log), and peer sync scans from a given tip hash (blocks
//! strictly after it).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::Block;
use crate::fs::DataFs;
use crate::hash::Hash;

/// One line of the block log: the block's own hash paired with the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub hash: Hash,
    pub block: Block,
}

#[derive(Debug, Error)]
pub enum BlockLogError {
    #[error("block log io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt block log record: {0}")]
    CorruptRecord(String),
}

/// Appends one record as a single JSON line. Fails with `Io` if the
/// filesystem rejects the write.
pub fn append(fs: &dyn DataFs, path: &Path, record: &BlockRecord) -> Result<(), BlockLogError> {
    let line = serde_json::to_string(record)
        .expect("BlockRecord always serializes");
    fs.append_line(path, &line)?;
    Ok(())
}

/// Scans the log for blocks after `from`.
///
/// If `from` is the empty hash, every record is returned in file order.
/// Otherwise, only records strictly after the one whose `hash` equals
/// `from` are returned; if `from` is never found, the result is empty. A
/// missing log file is treated as an empty log, not an error (a node's
/// very first boot has no log yet).
///
/// A trailing line that is present but fails to parse as a `BlockRecord`
/// aborts the scan with `CorruptRecord` — there is no recovery from a
/// partial write mid-line. A trailing line that is empty or
/// whitespace-only (the common shape of an interrupted line append) is
/// silently skipped.
pub fn scan_from(
    fs: &dyn DataFs,
    path: &Path,
    from: Hash,
) -> Result<Vec<BlockRecord>, BlockLogError> {
    if !fs.exists(path) {
        return Ok(Vec::new());
    }

    let contents = fs.read_to_string(path)?;
    let mut collecting = from.is_empty();
    let mut out = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let record: BlockRecord = serde_json::from_str(line)
            .map_err(|e| BlockLogError::CorruptRecord(e.to_string()))?;
        if collecting {
            out.push(record);
        } else if record.hash == from {
            collecting = true;
        }
    }

    Ok(out)
}
