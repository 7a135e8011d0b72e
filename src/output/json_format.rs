//! JSON output formatting.

use crate::types::ScanRecord;
use std::io::{self, Write};

/// Print records as a pretty-printed JSON array.
pub fn print_json(records: &[ScanRecord]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_json(&mut out, records)
}

fn write_json<W: Write>(out: &mut W, records: &[ScanRecord]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, records).map_err(io::Error::other)?;
    writeln!(out)
}
