//! Result writers.
//!
//! Both outputs are header-less comma-separated text, one record per line.

use crate::error::IoError;
use std::io::Write;
use vdsmatch_core::{MatchResult, Network};

/// Writes one `sensorID,roadID` line per matched sensor, ascending sensor ID.
///
/// Unmatched sensors produce no line. Returns the number of lines written.
pub fn write_assignments<W: Write>(out: &mut W, result: &MatchResult) -> Result<usize, IoError> {
    let mut written = 0;
    for (sensor, road) in result.assignments() {
        writeln!(out, "{},{}", sensor, road).map_err(IoError::Write)?;
        written += 1;
    }
    out.flush().map_err(IoError::Write)?;
    Ok(written)
}

/// Writes the link adjacency listing, one line per link in ascending ID:
/// `linkID,#before,#after,beforeIn...,beforeOut...,afterIn...,afterOut...`
pub fn write_adjacency<W: Write>(out: &mut W, network: &Network) -> Result<usize, IoError> {
    for index in 0..network.links().len() {
        let adj = network.adjacency(index);
        let mut line = format!("{},{},{}", adj.link, adj.before_count(), adj.after_count());
        for id in adj
            .before_in
            .iter()
            .chain(&adj.before_out)
            .chain(&adj.after_in)
            .chain(&adj.after_out)
        {
            line.push(',');
            line.push_str(&id.to_string());
        }
        writeln!(out, "{}", line).map_err(IoError::Write)?;
    }
    out.flush().map_err(IoError::Write)?;
    Ok(network.links().len())
}
