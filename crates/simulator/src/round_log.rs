//! CSV output of per-round snapshots.

use sanders_simulation::RoundSnapshot;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Write a header line followed by one line per snapshot.
pub fn write_csv<W: Write>(mut out: W, snapshots: &[RoundSnapshot]) -> io::Result<()> {
    writeln!(out, "{}", RoundSnapshot::CSV_HEADER)?;
    for snapshot in snapshots {
        writeln!(out, "{}", snapshot.to_csv_row())?;
    }
    out.flush()
}

/// Write the snapshots to a file, replacing it if it exists.
pub fn write_csv_file(path: &Path, snapshots: &[RoundSnapshot]) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(BufWriter::new(file), snapshots)
}
