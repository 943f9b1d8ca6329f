use crate::Result;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Outcome of one staging pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    pub copied: usize,
}

/// True for `.mid`/`.midi` files, any case.
fn is_midi_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ext == "mid" || ext == "midi"
        })
        .unwrap_or(false)
}

/// Whitespace in file names breaks downstream command-line tooling;
/// every whitespace character becomes an underscore.
fn normalized_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Stage a corpus: flatten every MIDI file under `source_root` into
/// `dest_root` with whitespace-normalized names.
///
/// Idempotent: the destination is deleted and recreated, so re-running
/// always yields exactly the current source content. Name collisions in
/// the flattened layout resolve to the last file walked.
pub fn stage(source_root: &Path, dest_root: &Path) -> Result<StageReport> {
    if dest_root.exists() {
        std::fs::remove_dir_all(dest_root)?;
    }
    std::fs::create_dir_all(dest_root)?;

    let mut report = StageReport::default();
    for entry in WalkDir::new(source_root) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || !is_midi_file(entry.path()) {
            continue;
        }

        let name = normalized_name(&entry.file_name().to_string_lossy());
        let dest = dest_root.join(name);
        debug!(from = %entry.path().display(), to = %dest.display(), "staging");
        std::fs::copy(entry.path(), &dest)?;
        report.copied += 1;
    }

    info!(
        "staged {} files from {} into {}",
        report.copied,
        source_root.display(),
        dest_root.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flattens_and_normalizes_names() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let dest_path = dest.path().join("staged");

        std::fs::create_dir_all(source.path().join("composer a")).unwrap();
        std::fs::write(
            source.path().join("composer a/moonlight sonata.mid"),
            b"m1",
        )
        .unwrap();
        std::fs::write(source.path().join("fugue\tno 2.MIDI"), b"m2").unwrap();
        std::fs::write(source.path().join("notes.txt"), b"not midi").unwrap();

        let report = stage(source.path(), &dest_path).unwrap();
        assert_eq!(report.copied, 2);

        assert!(dest_path.join("moonlight_sonata.mid").exists());
        assert!(dest_path.join("fugue_no_2.MIDI").exists());
        assert!(!dest_path.join("notes.txt").exists());
    }

    #[test]
    fn rerun_replaces_prior_contents() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let dest_path = dest.path().join("staged");

        std::fs::write(source.path().join("old.mid"), b"old").unwrap();
        stage(source.path(), &dest_path).unwrap();
        assert!(dest_path.join("old.mid").exists());

        std::fs::remove_file(source.path().join("old.mid")).unwrap();
        std::fs::write(source.path().join("new.mid"), b"new").unwrap();

        let report = stage(source.path(), &dest_path).unwrap();
        assert_eq!(report.copied, 1);
        assert!(!dest_path.join("old.mid").exists());
        assert!(dest_path.join("new.mid").exists());
    }

    #[test]
    fn empty_source_stages_nothing() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let dest_path = dest.path().join("staged");

        let report = stage(source.path(), &dest_path).unwrap();
        assert_eq!(report.copied, 0);
        assert!(dest_path.exists());
    }
}
