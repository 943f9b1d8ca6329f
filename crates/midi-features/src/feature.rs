use crate::stats::Describe;
use crate::track::MidiTrack;
use crate::{Degenerate, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column names of the flattened feature vector, in row order.
///
/// This list is the schema contract with the corpus matrix: `to_row`
/// produces values in exactly this order, and the matrix keys its
/// columns off this list.
pub const FIELD_NAMES: [&str; 45] = [
    "tempo",
    "beat_count",
    "note_count",
    "downbeat_count",
    "downbeat_ratio",
    "duration_secs",
    "distinct_onset_count",
    "instrument_count",
    "note_density",
    "simultaneity_ratio",
    "tempo_change_rate",
    "resolution",
    "note_duration_mean",
    "note_duration_std_dev",
    "note_duration_min",
    "note_duration_p25",
    "note_duration_p50",
    "note_duration_p75",
    "note_duration_max",
    "note_velocity_mean",
    "note_velocity_std_dev",
    "note_velocity_min",
    "note_velocity_p25",
    "note_velocity_p50",
    "note_velocity_p75",
    "note_velocity_max",
    "note_pitch_mean",
    "note_pitch_std_dev",
    "note_pitch_min",
    "note_pitch_p25",
    "note_pitch_p50",
    "note_pitch_p75",
    "note_pitch_max",
    "pitch_class_0",
    "pitch_class_1",
    "pitch_class_2",
    "pitch_class_3",
    "pitch_class_4",
    "pitch_class_5",
    "pitch_class_6",
    "pitch_class_7",
    "pitch_class_8",
    "pitch_class_9",
    "pitch_class_10",
    "pitch_class_11",
];

pub const FIELD_COUNT: usize = FIELD_NAMES.len();

/// Handcrafted features of one MIDI file.
///
/// Immutable once constructed. Field grouping is semantic; the flat
/// numeric row (and its order) comes from [`FeatureVector::to_row`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    // Global scalars
    pub tempo: f64,
    pub beat_count: usize,
    pub note_count: usize,
    pub downbeat_count: usize,
    /// Downbeats over beats — the literal ratio, not a music-theoretic
    /// percentage
    pub downbeat_ratio: f64,
    pub duration_secs: f64,
    pub distinct_onset_count: usize,
    pub instrument_count: usize,
    pub note_density: f64,
    /// Fraction of onsets coinciding with another onset
    pub simultaneity_ratio: f64,
    pub tempo_change_rate: f64,
    pub resolution: u16,

    // Note-level summaries
    pub note_duration: Describe,
    pub note_velocity: Describe,
    pub note_pitch: Describe,

    // Pitch-class fractions, C through B
    pub pitch_classes: [f64; 12],
}

impl FeatureVector {
    /// Flatten to the fixed row layout described by [`FIELD_NAMES`].
    pub fn to_row(&self) -> Vec<f64> {
        let mut row = Vec::with_capacity(FIELD_COUNT);
        row.push(self.tempo);
        row.push(self.beat_count as f64);
        row.push(self.note_count as f64);
        row.push(self.downbeat_count as f64);
        row.push(self.downbeat_ratio);
        row.push(self.duration_secs);
        row.push(self.distinct_onset_count as f64);
        row.push(self.instrument_count as f64);
        row.push(self.note_density);
        row.push(self.simultaneity_ratio);
        row.push(self.tempo_change_rate);
        row.push(self.resolution as f64);
        row.extend(self.note_duration.fields());
        row.extend(self.note_velocity.fields());
        row.extend(self.note_pitch.fields());
        row.extend(self.pitch_classes);
        row
    }
}

/// Extract the feature vector from a MIDI file on disk.
pub fn extract(path: &Path) -> Result<FeatureVector> {
    let track = MidiTrack::from_path(path)?;
    extract_from_track(&track)
}

/// Extract the feature vector from an already-parsed track.
///
/// Degenerate inputs (no timed content, no beats, no notes) fail with a
/// typed error before any division, so a returned vector never carries
/// NaN or infinity.
pub fn extract_from_track(track: &MidiTrack) -> Result<FeatureVector> {
    let duration_secs = track.end_time();
    if duration_secs <= 0.0 {
        return Err(Error::Degenerate(Degenerate::ZeroDuration));
    }

    let beats = track.beats();
    if beats.is_empty() {
        return Err(Error::Degenerate(Degenerate::NoBeats));
    }

    let note_count = track.note_count();
    if note_count == 0 {
        return Err(Error::Degenerate(Degenerate::NoNotes));
    }

    let downbeats = track.downbeats();
    let distinct_onset_count = track.distinct_onset_count();

    // Note-level table, flattened across instruments
    let mut durations = Vec::with_capacity(note_count);
    let mut velocities = Vec::with_capacity(note_count);
    let mut pitches = Vec::with_capacity(note_count);
    for instrument in &track.instruments {
        for note in &instrument.notes {
            durations.push(note.duration());
            velocities.push(note.velocity as f64);
            pitches.push(note.pitch as f64);
        }
    }

    let note_duration =
        Describe::from_values(&durations).ok_or(Error::Degenerate(Degenerate::NoNotes))?;
    let note_velocity =
        Describe::from_values(&velocities).ok_or(Error::Degenerate(Degenerate::NoNotes))?;
    let note_pitch =
        Describe::from_values(&pitches).ok_or(Error::Degenerate(Degenerate::NoNotes))?;

    Ok(FeatureVector {
        tempo: track.estimate_tempo(),
        beat_count: beats.len(),
        note_count,
        downbeat_count: downbeats.len(),
        downbeat_ratio: downbeats.len() as f64 / beats.len() as f64,
        duration_secs,
        distinct_onset_count,
        instrument_count: track.distinct_program_count(),
        note_density: note_count as f64 / duration_secs,
        simultaneity_ratio: (note_count - distinct_onset_count) as f64 / note_count as f64,
        tempo_change_rate: track.tempo_change_count() as f64 / duration_secs,
        resolution: track.resolution,
        note_duration,
        note_velocity,
        note_pitch,
        pitch_classes: track.pitch_class_histogram(),
    })
}
