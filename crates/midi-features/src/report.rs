use crate::track::MidiTrack;
use serde::{Deserialize, Serialize};

const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Key name for a MIDI note number, sharps spelling: 60 → "C4".
pub fn note_name(pitch: u8) -> String {
    let name = NOTE_NAMES_SHARP[(pitch % 12) as usize];
    let octave = pitch as i16 / 12 - 1;
    format!("{name}{octave}")
}

/// Which of the 128 keys a piece leans on, as human-readable names.
///
/// Kept apart from the numeric feature vector on purpose: string-typed
/// fields never enter the corpus matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyUsageReport {
    pub most_used: String,
    /// Absent when the piece uses a single pitch
    pub second_most_used: Option<String>,
}

/// Rank pitches by occurrence count. Ties break toward the lower pitch
/// so the report is deterministic. None for a file with no notes.
pub fn key_usage(track: &MidiTrack) -> Option<KeyUsageReport> {
    let mut counts = [0usize; 128];
    for instrument in &track.instruments {
        for note in &instrument.notes {
            counts[note.pitch as usize] += 1;
        }
    }

    let mut ranked: Vec<(u8, usize)> = counts
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .map(|(pitch, &count)| (pitch as u8, count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let (top, _) = *ranked.first()?;
    Some(KeyUsageReport {
        most_used: note_name(top),
        second_most_used: ranked.get(1).map(|&(pitch, _)| note_name(pitch)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(69), "A4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(127), "G9");
    }

    fn track_with_pitches(pitches: &[u8]) -> MidiTrack {
        let mut events: Vec<(u64, Vec<u8>)> = Vec::new();
        for (i, &pitch) in pitches.iter().enumerate() {
            let onset = i as u64 * 480;
            events.push((onset, vec![0x90, pitch, 100]));
            events.push((onset + 480, vec![0x80, pitch, 0]));
        }

        let mut data = Vec::new();
        let mut prev = 0u64;
        events.sort_by_key(|e| e.0);
        for (tick, bytes) in &events {
            let delta = tick - prev;
            prev = *tick;
            // deltas here are 0 or 480
            if delta == 0 {
                data.push(0x00);
            } else {
                data.extend_from_slice(&[0x83, 0x60]);
            }
            data.extend(bytes);
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

        MidiTrack::parse(&buf).unwrap()
    }

    #[test]
    fn most_used_keys_ranked_by_count() {
        // A4 three times, C4 twice, E4 once
        let track = track_with_pitches(&[69, 60, 69, 64, 69, 60]);
        let report = key_usage(&track).unwrap();
        assert_eq!(report.most_used, "A4");
        assert_eq!(report.second_most_used.as_deref(), Some("C4"));
    }

    #[test]
    fn single_pitch_has_no_runner_up() {
        let track = track_with_pitches(&[60, 60, 60]);
        let report = key_usage(&track).unwrap();
        assert_eq!(report.most_used, "C4");
        assert_eq!(report.second_most_used, None);
    }

    #[test]
    fn no_notes_no_report() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"MThd");
        buf.extend_from_slice(&6u32.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&480u16.to_be_bytes());
        let data = [0x00, 0xFF, 0x2F, 0x00];
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
        buf.extend_from_slice(&data);

        let track = MidiTrack::parse(&buf).unwrap();
        assert_eq!(key_usage(&track), None);
    }

    #[test]
    fn ties_break_toward_lower_pitch() {
        let track = track_with_pitches(&[64, 60]);
        let report = key_usage(&track).unwrap();
        assert_eq!(report.most_used, "C4");
        assert_eq!(report.second_most_used.as_deref(), Some("E4"));
    }
}
