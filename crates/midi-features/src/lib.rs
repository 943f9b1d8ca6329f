pub mod feature;
pub mod report;
pub mod stats;
pub mod track;

pub use feature::{extract, extract_from_track, FeatureVector, FIELD_COUNT, FIELD_NAMES};
pub use report::{key_usage, note_name, KeyUsageReport};
pub use stats::Describe;
pub use track::{Instrument, MidiTrack, Note, TempoChange, TimeSignature};

/// Why a file produced no usable feature vector despite parsing cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degenerate {
    /// No notes in any instrument track
    NoNotes,
    /// Empty beat grid (no timed content)
    NoBeats,
    /// End time is not positive
    ZeroDuration,
}

impl std::fmt::Display for Degenerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoNotes => "no notes",
            Self::NoBeats => "no beats",
            Self::ZeroDuration => "zero duration",
        };
        f.write_str(s)
    }
}

/// Errors from MIDI feature extraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MIDI parse error: {0}")]
    Parse(String),

    #[error("degenerate input: {0}")]
    Degenerate(Degenerate),
}

impl Error {
    /// Parse and I/O failures are recoverable at the corpus level;
    /// so are degenerate inputs. The distinction only matters for
    /// skip accounting.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::Degenerate(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
