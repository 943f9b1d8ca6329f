use crate::matrix::CorpusMatrix;
use crate::Result;
use std::path::Path;
use tracing::{info, warn};

/// Outcome counts for one corpus build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Files that produced a row
    pub processed: usize,
    /// Files skipped because they would not parse
    pub skipped_parse: usize,
    /// Files skipped because they parsed to degenerate content
    pub skipped_degenerate: usize,
}

impl BuildReport {
    pub fn skipped(&self) -> usize {
        self.skipped_parse + self.skipped_degenerate
    }
}

/// Build the corpus matrix from a directory of MIDI files.
///
/// Every regular file is fed to the feature extractor. Parse and
/// degenerate failures are logged, counted, and skipped; they never
/// abort the batch. A schema mismatch does abort: it means the
/// extractor and the column list disagree, which is a bug.
///
/// Directory enumeration order is whatever the OS returns; row order in
/// the matrix is not meaningful, only column order is.
pub fn build(dir: &Path) -> Result<(CorpusMatrix, BuildReport)> {
    let mut matrix = CorpusMatrix::with_feature_columns();
    let mut report = BuildReport::default();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        match midi_features::extract(&path) {
            Ok(vector) => {
                matrix.push_row(vector.to_row())?;
                report.processed += 1;
            }
            Err(err) if err.is_degenerate() => {
                warn!(file = %path.display(), %err, "skipping degenerate file");
                report.skipped_degenerate += 1;
            }
            Err(err) => {
                warn!(file = %path.display(), %err, "skipping unparseable file");
                report.skipped_parse += 1;
            }
        }
    }

    info!(
        "{} files processed, {} skipped ({} parse, {} degenerate)",
        report.processed,
        report.skipped(),
        report.skipped_parse,
        report.skipped_degenerate
    );

    Ok((matrix, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Format-0 file with the given pitches as a one-beat-per-note
    /// melody at the default tempo.
    fn melody_midi(pitches: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        for &pitch in pitches {
            // each note starts as the previous one ends
            data.push(0x00);
            data.extend_from_slice(&[0x90, pitch, 100]);
            data.extend_from_slice(&[0x83, 0x60, 0x80, pitch, 0]);
        }
        data.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

        let mut buf = Vec::new();
        buf.extend_from_slice(b"MThd");
        buf.extend_from_slice(&6u32.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&480u16.to_be_bytes());
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
        buf.extend(data);
        buf
    }

    /// Parses cleanly but has no notes.
    fn noteless_midi() -> Vec<u8> {
        let data = [
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo
            0x83, 0x60, 0xFF, 0x2F, 0x00, // end of track a beat later
        ];

        let mut buf = Vec::new();
        buf.extend_from_slice(b"MThd");
        buf.extend_from_slice(&6u32.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&480u16.to_be_bytes());
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
        buf.extend_from_slice(&data);
        buf
    }

    #[test]
    fn builds_rows_and_counts_skips() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.mid"), melody_midi(&[60, 64, 67])).unwrap();
        std::fs::write(dir.path().join("two.mid"), melody_midi(&[55, 59, 62])).unwrap();
        std::fs::write(dir.path().join("broken.mid"), b"definitely not midi").unwrap();
        std::fs::write(dir.path().join("silent.mid"), noteless_midi()).unwrap();

        let (matrix, report) = build(dir.path()).unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.skipped_parse, 1);
        assert_eq!(report.skipped_degenerate, 1);
        assert_eq!(report.skipped(), 2);

        assert_eq!(matrix.row_count(), 2);
        assert_eq!(matrix.column_count(), midi_features::FIELD_COUNT);
        for row in matrix.rows() {
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn empty_directory_yields_zero_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (matrix, report) = build(dir.path()).unwrap();

        assert!(matrix.is_empty());
        assert_eq!(matrix.column_count(), midi_features::FIELD_COUNT);
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped(), 0);
    }

    #[test]
    fn all_failing_directory_yields_zero_rows() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mid"), b"junk").unwrap();
        std::fs::write(dir.path().join("b.mid"), b"more junk").unwrap();

        let (matrix, report) = build(dir.path()).unwrap();

        assert!(matrix.is_empty());
        assert_eq!(matrix.column_count(), midi_features::FIELD_COUNT);
        assert_eq!(report.skipped_parse, 2);
    }

    #[test]
    fn subdirectories_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("one.mid"), melody_midi(&[60])).unwrap();

        let (matrix, report) = build(dir.path()).unwrap();
        assert_eq!(matrix.row_count(), 1);
        assert_eq!(report.processed, 1);
    }
}
