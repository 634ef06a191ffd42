//! Outcome Export
//!
//! Tab-separated outcome history, one line per round in round order. Columns
//! are the satisfied flag followed by the outcome's numeric fields.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use trm_events::Outcome;

/// Writes round outcomes to a TSV file.
pub struct OutcomeExporter {
    writer: Option<BufWriter<File>>,
    privileged: bool,
    rows: u64,
}

impl OutcomeExporter {
    /// Creates the file and writes the header. `privileged` adds the
    /// privileged-role energy column.
    pub fn new(path: impl AsRef<Path>, privileged: bool) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", Outcome::tsv_header(privileged))?;
        Ok(Self {
            writer: Some(writer),
            privileged,
            rows: 0,
        })
    }

    /// An exporter that discards everything
    pub fn null() -> Self {
        Self {
            writer: None,
            privileged: false,
            rows: 0,
        }
    }

    /// Rounds written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Writes a round. A round without an outcome becomes a comment line.
    pub fn write_round(&mut self, round: u32, outcome: Option<&Outcome>) -> std::io::Result<()> {
        self.rows += 1;
        if let Some(ref mut writer) = self.writer {
            match outcome {
                Some(outcome) => writeln!(writer, "{}", outcome.to_tsv(self.privileged))?,
                None => writeln!(writer, "# round {}: no trustworthy path found", round)?,
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for OutcomeExporter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("Failed to flush outcome export: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trm_events::Satisfaction;

    #[test]
    fn test_export_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outcomes.tsv");

        {
            let mut exporter = OutcomeExporter::new(&path, true).unwrap();
            let outcome = Outcome::single(Satisfaction::binary(true), 2);
            exporter.write_round(1, Some(&outcome)).unwrap();
            exporter.write_round(2, None).unwrap();
            assert_eq!(exporter.rows(), 2);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("satisfied\t"));
        assert_eq!(lines[0].split('\t').count(), 8);
        assert!(lines[1].starts_with("1\t1.000000\t2.000000"));
        assert_eq!(lines[1].split('\t').count(), 8);
        assert_eq!(lines[2], "# round 2: no trustworthy path found");
    }

    #[test]
    fn test_null_exporter() {
        let mut exporter = OutcomeExporter::null();
        exporter.write_round(1, None).unwrap();
        exporter.flush().unwrap();
        assert_eq!(exporter.rows(), 1);
    }
}
