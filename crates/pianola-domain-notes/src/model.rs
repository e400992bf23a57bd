use pianola_ports::types::{NoteEvent, Seconds};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum NoteStoreError {
    #[error("note list is empty")]
    Empty,
    #[error("note {index}: pitch {pitch} outside 0..=127")]
    PitchOutOfRange { index: usize, pitch: u8 },
    #[error("note {index}: start time {start_time} must be finite and >= 0")]
    InvalidStart { index: usize, start_time: Seconds },
    #[error("note {index}: duration {duration} must be finite and > 0")]
    InvalidDuration { index: usize, duration: Seconds },
    #[error("note {index}: velocity {velocity} outside 0.0..=1.0")]
    InvalidVelocity { index: usize, velocity: f32 },
}

const WINDOW_SLACK: Seconds = 1e-6;

/// Immutable snapshot of one loaded file's notes, ordered by start time.
///
/// Ties keep their input order. Repeated `NoteKey`s are collapsed to the first
/// occurrence so each key names exactly one note.
#[derive(Clone, Debug)]
pub struct NoteStore {
    notes: Vec<NoteEvent>,
    track_count: u32,
    duration: Seconds,
    longest_note: Seconds,
}

impl NoteStore {
    pub fn new(notes: Vec<NoteEvent>) -> Result<Self, NoteStoreError> {
        if notes.is_empty() {
            return Err(NoteStoreError::Empty);
        }
        for (index, note) in notes.iter().enumerate() {
            validate(index, note)?;
        }

        let mut notes = notes;
        // sort_by is stable
        notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let mut seen = HashSet::with_capacity(notes.len());
        let before = notes.len();
        notes.retain(|note| seen.insert(note.key()));
        if notes.len() != before {
            log::warn!(
                "collapsed {} duplicate note instance(s)",
                before - notes.len()
            );
        }

        let track_count = notes
            .iter()
            .map(|note| note.track_index + 1)
            .max()
            .unwrap_or(0);
        let duration = notes
            .iter()
            .map(NoteEvent::end_time)
            .fold(0.0, f64::max);
        let longest_note = notes.iter().map(|note| note.duration).fold(0.0, f64::max);

        Ok(Self {
            notes,
            track_count,
            duration,
            longest_note,
        })
    }

    pub fn notes(&self) -> &[NoteEvent] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// One past the highest track index present.
    pub fn track_count(&self) -> u32 {
        self.track_count
    }

    /// Latest end time over all notes.
    pub fn duration(&self) -> Seconds {
        self.duration
    }

    /// Number of leading notes whose start time is at or before `logical_time`.
    /// Only these can be active at that time.
    pub fn started_before(&self, logical_time: Seconds) -> usize {
        self.notes
            .partition_point(|note| note.start_time <= logical_time)
    }

    /// Contiguous run of notes that may be active at `logical_time`: everything that has
    /// started and began no earlier than the longest note could still reach.
    pub fn active_window(&self, logical_time: Seconds) -> &[NoteEvent] {
        let earliest = logical_time - self.longest_note - WINDOW_SLACK;
        let lo = self
            .notes
            .partition_point(|note| note.start_time < earliest);
        let hi = self.started_before(logical_time).max(lo);
        &self.notes[lo..hi]
    }
}

fn validate(index: usize, note: &NoteEvent) -> Result<(), NoteStoreError> {
    if note.pitch > 127 {
        return Err(NoteStoreError::PitchOutOfRange {
            index,
            pitch: note.pitch,
        });
    }
    if !note.start_time.is_finite() || note.start_time < 0.0 {
        return Err(NoteStoreError::InvalidStart {
            index,
            start_time: note.start_time,
        });
    }
    if !note.duration.is_finite() || note.duration <= 0.0 {
        return Err(NoteStoreError::InvalidDuration {
            index,
            duration: note.duration,
        });
    }
    if !(0.0..=1.0).contains(&note.velocity) {
        return Err(NoteStoreError::InvalidVelocity {
            index,
            velocity: note.velocity,
        });
    }
    Ok(())
}
