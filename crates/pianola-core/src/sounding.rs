use pianola_ports::types::{NoteKey, TrackIndex};
use pianola_ports::voice::{VoiceHandle, VoicePort};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SoundingEntry {
    pub key: NoteKey,
    pub handle: VoiceHandle,
}

/// Note instances that currently own a backend voice.
///
/// Removing an entry is the only way its handle reaches `VoicePort::stop`, so every
/// handle is stopped at most once. Iteration is in key order for deterministic stop order.
#[derive(Debug, Default)]
pub struct SoundingSet {
    entries: BTreeMap<NoteKey, VoiceHandle>,
}

impl SoundingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &NoteKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = SoundingEntry> + '_ {
        self.entries
            .iter()
            .map(|(key, handle)| SoundingEntry {
                key: *key,
                handle: *handle,
            })
    }

    pub fn insert(&mut self, entry: SoundingEntry) {
        let previous = self.entries.insert(entry.key, entry.handle);
        debug_assert!(previous.is_none(), "note instance {} started twice", entry.key);
    }

    /// Stops and removes every entry matching `release`. Returns the released keys in stop order.
    pub fn release_where<F>(&mut self, voices: &dyn VoicePort, mut release: F) -> Vec<NoteKey>
    where
        F: FnMut(&NoteKey) -> bool,
    {
        let keys: Vec<NoteKey> = self
            .entries
            .keys()
            .filter(|key| release(key))
            .copied()
            .collect();
        for key in &keys {
            if let Some(handle) = self.entries.remove(key) {
                voices.stop(handle);
            }
        }
        keys
    }

    pub fn release_track(&mut self, voices: &dyn VoicePort, track: TrackIndex) -> Vec<NoteKey> {
        self.release_where(voices, |key| key.track_index == track)
    }

    pub fn release_all(&mut self, voices: &dyn VoicePort) -> Vec<NoteKey> {
        self.release_where(voices, |_| true)
    }
}
