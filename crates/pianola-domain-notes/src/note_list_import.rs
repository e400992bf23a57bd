use pianola_ports::types::{NoteEvent, TrackIndex};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum NoteImportError {
    #[error("io error: {0}")]
    Io(String),
    #[error("malformed note list: {0}")]
    Malformed(String),
    #[error("track {track} note {index}: midi number {midi} outside 0..=127")]
    PitchOutOfRange { track: usize, index: usize, midi: i64 },
}

// Notes grouped per track, times in seconds.
#[derive(Deserialize)]
struct NoteListFile {
    tracks: Vec<TrackEntry>,
}

#[derive(Deserialize)]
struct TrackEntry {
    #[serde(default)]
    notes: Vec<NoteEntry>,
}

#[derive(Deserialize)]
struct NoteEntry {
    midi: i64,
    time: f64,
    duration: f64,
    #[serde(default = "default_velocity")]
    velocity: f32,
}

fn default_velocity() -> f32 {
    0.8
}

pub fn import_note_list_path(path: &Path) -> Result<Vec<NoteEvent>, NoteImportError> {
    let data = fs::read(path).map_err(|e| NoteImportError::Io(e.to_string()))?;
    parse_note_list_json(&data)
}

/// Flattens all tracks into one list; `track_index` is the track's position in the file.
/// Range checks beyond the pitch are left to `NoteStore::new`.
pub fn parse_note_list_json(data: &[u8]) -> Result<Vec<NoteEvent>, NoteImportError> {
    let file: NoteListFile =
        serde_json::from_slice(data).map_err(|e| NoteImportError::Malformed(e.to_string()))?;

    let mut notes = Vec::new();
    for (track, entry) in file.tracks.iter().enumerate() {
        for (index, note) in entry.notes.iter().enumerate() {
            if !(0..=127).contains(&note.midi) {
                return Err(NoteImportError::PitchOutOfRange {
                    track,
                    index,
                    midi: note.midi,
                });
            }
            notes.push(NoteEvent {
                pitch: note.midi as u8,
                start_time: note.time,
                duration: note.duration,
                velocity: note.velocity,
                track_index: track as TrackIndex,
            });
        }
    }
    Ok(notes)
}
