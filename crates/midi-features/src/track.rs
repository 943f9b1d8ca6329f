use crate::{Error, Result};
use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// MIDI default before the first Set Tempo event: 120 BPM.
const DEFAULT_USEC_PER_BEAT: f64 = 500_000.0;

/// Channel 10 (zero-based 9) is reserved for percussion.
const DRUM_CHANNEL: u8 = 9;

/// A single note with wall-clock timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Onset in seconds
    pub start: f64,
    /// Offset in seconds
    pub end: f64,
    pub velocity: u8,
    pub pitch: u8,
}

impl Note {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Notes grouped by the program in effect at their onset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// General MIDI program number (0-127)
    pub program: u8,
    pub is_drum: bool,
    pub notes: Vec<Note>,
}

/// One entry of the tempo map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    /// Seconds from the start of the file
    pub time: f64,
    pub bpm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub time: f64,
    pub numerator: u8,
    pub denominator: u8,
}

/// Converts absolute ticks to seconds across tempo segments.
#[derive(Debug, Clone)]
struct TempoMap {
    ppq: f64,
    /// (start tick, seconds at start tick, microseconds per beat)
    segments: Vec<(u64, f64, f64)>,
}

impl TempoMap {
    /// `events` must be sorted by tick. Later events at the same tick win.
    fn new(ppq: u16, events: &[(u64, u32)]) -> Self {
        let ppq = ppq.max(1) as f64;
        let mut segments: Vec<(u64, f64, f64)> = vec![(0, 0.0, DEFAULT_USEC_PER_BEAT)];

        for &(tick, uspb) in events {
            if tick == 0 {
                segments[0].2 = uspb as f64;
                continue;
            }
            let seconds = Self::seconds_at(&segments, ppq, tick);
            segments.push((tick, seconds, uspb as f64));
        }

        Self { ppq, segments }
    }

    fn tick_to_seconds(&self, tick: u64) -> f64 {
        Self::seconds_at(&self.segments, self.ppq, tick)
    }

    fn seconds_at(segments: &[(u64, f64, f64)], ppq: f64, tick: u64) -> f64 {
        // segments[0] starts at tick 0, so a governing segment always exists
        let &(start, base, uspb) = segments
            .iter()
            .rev()
            .find(|s| s.0 <= tick)
            .unwrap_or(&segments[0]);
        base + (tick - start) as f64 * uspb / (ppq * 1_000_000.0)
    }
}

/// In-memory representation of one parsed MIDI file.
///
/// Exposes the musical facts the feature extractor consumes: the tempo
/// and time-signature maps, instrument-grouped notes with second-based
/// timing, and derived beat/downbeat/onset grids.
#[derive(Debug, Clone)]
pub struct MidiTrack {
    /// Ticks per quarter note
    pub resolution: u16,
    pub tempo_changes: Vec<TempoChange>,
    pub time_signatures: Vec<TimeSignature>,
    pub instruments: Vec<Instrument>,

    total_ticks: u64,
    tempo_map: TempoMap,
    /// Tick-based time signatures, kept for measure arithmetic
    sig_ticks: Vec<(u64, u8, u8)>,
    /// Sorted onset ticks of every note (exact, for distinct counting)
    onset_ticks: Vec<u64>,
}

impl MidiTrack {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let smf = Smf::parse(bytes).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(Self::from_smf(&smf))
    }

    fn from_smf(smf: &Smf) -> Self {
        let resolution = match smf.header.timing {
            midly::Timing::Metrical(ticks) => ticks.as_int(),
            midly::Timing::Timecode(_, _) => 480,
        };

        struct RawNote {
            onset: u64,
            offset: u64,
            pitch: u8,
            velocity: u8,
            program: u8,
            is_drum: bool,
        }

        let mut raw_notes: Vec<RawNote> = Vec::new();
        let mut tempo_events: Vec<(u64, u32)> = Vec::new();
        let mut sig_events: Vec<(u64, u8, u8)> = Vec::new();
        let mut total_ticks: u64 = 0;

        for track in &smf.tracks {
            let mut current_tick: u64 = 0;
            let mut programs = [0u8; 16];
            // Map (channel, pitch) → Vec<(onset_tick, velocity)> for stacking
            let mut pending: HashMap<(u8, u8), Vec<(u64, u8)>> = HashMap::new();

            for event in track {
                current_tick += event.delta.as_int() as u64;

                match event.kind {
                    TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                        tempo_events.push((current_tick, tempo.as_int()));
                    }
                    TrackEventKind::Meta(MetaMessage::TimeSignature(num, denom_pow, _, _)) => {
                        sig_events.push((current_tick, num, 1u8 << denom_pow.min(7)));
                    }
                    TrackEventKind::Midi { channel, message } => {
                        let ch = channel.as_int();
                        match message {
                            MidiMessage::ProgramChange { program } => {
                                programs[ch as usize] = program.as_int();
                            }
                            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                                pending
                                    .entry((ch, key.as_int()))
                                    .or_default()
                                    .push((current_tick, vel.as_int()));
                            }
                            MidiMessage::NoteOff { key, .. }
                            | MidiMessage::NoteOn { key, .. } => {
                                // vel=0 NoteOn is NoteOff
                                if let Some(stack) = pending.get_mut(&(ch, key.as_int())) {
                                    if let Some((onset, velocity)) = stack.pop() {
                                        raw_notes.push(RawNote {
                                            onset,
                                            offset: current_tick,
                                            pitch: key.as_int(),
                                            velocity,
                                            program: programs[ch as usize],
                                            is_drum: ch == DRUM_CHANNEL,
                                        });
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                    _ => {}
                }

                total_ticks = total_ticks.max(current_tick);
            }

            // Close any unclosed notes at the track's final tick
            for ((ch, pitch), stack) in &pending {
                for &(onset, velocity) in stack {
                    raw_notes.push(RawNote {
                        onset,
                        offset: current_tick,
                        pitch: *pitch,
                        velocity,
                        program: programs[*ch as usize],
                        is_drum: *ch == DRUM_CHANNEL,
                    });
                }
            }
        }

        // Sort by onset, then pitch for determinism
        raw_notes.sort_by(|a, b| a.onset.cmp(&b.onset).then(a.pitch.cmp(&b.pitch)));

        // Deduplicate tempo changes (multiple tracks may repeat them in format 1)
        tempo_events.sort_by_key(|t| t.0);
        tempo_events.dedup_by(|a, b| a.0 == b.0 && a.1 == b.1);

        sig_events.sort_by_key(|t| t.0);
        sig_events.dedup_by(|a, b| a.0 == b.0);

        let tempo_map = TempoMap::new(resolution, &tempo_events);

        let tempo_changes = tempo_events
            .iter()
            .map(|&(tick, uspb)| TempoChange {
                time: tempo_map.tick_to_seconds(tick),
                bpm: 60_000_000.0 / uspb as f64,
            })
            .collect();

        let time_signatures = sig_events
            .iter()
            .map(|&(tick, num, den)| TimeSignature {
                time: tempo_map.tick_to_seconds(tick),
                numerator: num,
                denominator: den,
            })
            .collect();

        let onset_ticks: Vec<u64> = {
            let mut ticks: Vec<u64> = raw_notes.iter().map(|n| n.onset).collect();
            ticks.sort_unstable();
            ticks
        };

        // Group notes by the program in effect at their onset
        let mut grouped: BTreeMap<(u8, bool), Vec<Note>> = BTreeMap::new();
        for raw in &raw_notes {
            grouped.entry((raw.program, raw.is_drum)).or_default().push(Note {
                start: tempo_map.tick_to_seconds(raw.onset),
                end: tempo_map.tick_to_seconds(raw.offset),
                velocity: raw.velocity,
                pitch: raw.pitch,
            });
        }
        let instruments = grouped
            .into_iter()
            .map(|((program, is_drum), notes)| Instrument {
                program,
                is_drum,
                notes,
            })
            .collect();

        Self {
            resolution,
            tempo_changes,
            time_signatures,
            instruments,
            total_ticks,
            tempo_map,
            sig_ticks: sig_events,
            onset_ticks,
        }
    }

    /// Seconds at the final event tick.
    pub fn end_time(&self) -> f64 {
        self.tempo_map.tick_to_seconds(self.total_ticks)
    }

    pub fn note_count(&self) -> usize {
        self.instruments.iter().map(|i| i.notes.len()).sum()
    }

    /// Quarter-note grid timestamps, strictly before the end of the file.
    pub fn beats(&self) -> Vec<f64> {
        let step = self.resolution.max(1) as u64;
        (0..self.total_ticks)
            .step_by(step as usize)
            .map(|tick| self.tempo_map.tick_to_seconds(tick))
            .collect()
    }

    /// Measure-start timestamps over the time-signature map (4/4 assumed
    /// where no signature is present).
    pub fn downbeats(&self) -> Vec<f64> {
        let ppq = self.resolution.max(1) as f64;

        let mut sigs = self.sig_ticks.clone();
        if sigs.first().map_or(true, |s| s.0 > 0) {
            sigs.insert(0, (0, 4, 4));
        }

        let mut result = Vec::new();
        for (i, &(start, num, den)) in sigs.iter().enumerate() {
            if num == 0 || den == 0 {
                continue;
            }
            let end = sigs.get(i + 1).map_or(self.total_ticks, |s| s.0);
            let measure_ticks = ppq * num as f64 * 4.0 / den as f64;
            if measure_ticks <= 0.0 {
                continue;
            }
            let mut tick = start as f64;
            while tick < end as f64 {
                result.push(self.tempo_map.tick_to_seconds(tick.round() as u64));
                tick += measure_ticks;
            }
        }
        result
    }

    /// Note onset timestamps in seconds, sorted ascending.
    pub fn onsets(&self) -> Vec<f64> {
        self.onset_ticks
            .iter()
            .map(|&tick| self.tempo_map.tick_to_seconds(tick))
            .collect()
    }

    /// Number of unique onset timestamps (tick-exact).
    pub fn distinct_onset_count(&self) -> usize {
        let mut ticks = self.onset_ticks.clone();
        ticks.dedup();
        ticks.len()
    }

    /// Count-weighted pitch-class fractions, summing to 1.0 (all zeros
    /// for a file with no notes).
    pub fn pitch_class_histogram(&self) -> [f64; 12] {
        let mut histogram = [0.0_f64; 12];
        for instrument in &self.instruments {
            for note in &instrument.notes {
                histogram[(note.pitch % 12) as usize] += 1.0;
            }
        }
        let total: f64 = histogram.iter().sum();
        if total > 0.0 {
            for h in &mut histogram {
                *h /= total;
            }
        }
        histogram
    }

    /// Duration-weighted mean BPM of the tempo map; 120 BPM for a file
    /// with no tempo events or no timed content.
    pub fn estimate_tempo(&self) -> f64 {
        let total_seconds = self.end_time();
        if total_seconds <= 0.0 || self.tempo_changes.is_empty() {
            return self
                .tempo_changes
                .first()
                .map_or(120.0, |tc| tc.bpm);
        }

        // Effective tempo segments over [0, end): default 120 until the
        // first event, then each event until the next
        let mut weighted = 0.0;
        let mut prev_time = 0.0;
        let mut prev_bpm = 120.0;
        for tc in &self.tempo_changes {
            let time = tc.time.min(total_seconds);
            weighted += (time - prev_time) * prev_bpm;
            prev_time = time;
            prev_bpm = tc.bpm;
        }
        weighted += (total_seconds - prev_time) * prev_bpm;

        weighted / total_seconds
    }

    /// Tempo events that alter the effective tempo. The initial statement
    /// (at time zero, or merely restating the current tempo) does not
    /// count, so a constant-tempo file reports zero changes.
    pub fn tempo_change_count(&self) -> usize {
        let mut effective = 120.0;
        let mut count = 0;
        for tc in &self.tempo_changes {
            if tc.bpm != effective {
                if tc.time > 0.0 {
                    count += 1;
                }
                effective = tc.bpm;
            }
        }
        count
    }

    /// Distinct General MIDI program numbers across all instruments.
    pub fn distinct_program_count(&self) -> usize {
        let mut programs: Vec<u8> = self.instruments.iter().map(|i| i.program).collect();
        programs.sort_unstable();
        programs.dedup();
        programs.len()
    }
}
