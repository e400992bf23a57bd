use crate::mute::MuteController;
use crate::sounding::{SoundingEntry, SoundingSet};
use pianola_domain_notes::{note_label, NoteStore};
use pianola_ports::playback::{NoteView, TickReport, VoiceFailure};
use pianola_ports::types::{NoteEvent, NoteKey, Seconds};
use pianola_ports::voice::{VoicePort, VoiceRequest};
use std::collections::BTreeSet;

pub fn should_sound(note: &NoteEvent, logical_time: Seconds, mutes: &MuteController) -> bool {
    note.is_active_at(logical_time) && !mutes.is_muted(note.track_index)
}

/// Decides, once per tick, which note instances start and stop sounding.
///
/// Membership in a note's `[start, end]` interval is re-evaluated on every tick, so a
/// backward seek re-enters an interval and triggers the note again, and a muted note
/// whose interval is still running is stopped on the spot.
#[derive(Debug, Default)]
pub struct Scheduler {
    sounding: SoundingSet,
    // keys whose most recent start attempt failed
    failing: BTreeSet<NoteKey>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sounding(&self) -> &SoundingSet {
        &self.sounding
    }

    pub fn sounding_mut(&mut self) -> &mut SoundingSet {
        &mut self.sounding
    }

    /// All stops for the tick are issued before any start.
    pub fn tick(
        &mut self,
        logical_time: Seconds,
        store: &NoteStore,
        mutes: &MuteController,
        voices: &dyn VoicePort,
    ) -> TickReport {
        let window = store.active_window(logical_time);
        let wanted: BTreeSet<NoteKey> = window
            .iter()
            .filter(|note| should_sound(note, logical_time, mutes))
            .map(NoteEvent::key)
            .collect();

        let stopped = self
            .sounding
            .release_where(voices, |key| !wanted.contains(key));
        self.failing.retain(|key| wanted.contains(key));

        let mut started = Vec::new();
        let mut failed = Vec::new();
        for note in window {
            let key = note.key();
            if !wanted.contains(&key) || self.sounding.contains(&key) {
                continue;
            }
            match voices.start(VoiceRequest::for_note(note)) {
                Ok(handle) => {
                    self.sounding.insert(SoundingEntry { key, handle });
                    self.failing.remove(&key);
                    started.push(key);
                }
                Err(error) => {
                    let retry = !self.failing.insert(key);
                    if retry {
                        log::debug!("voice start retry failed for {}: {}", key, error);
                    } else {
                        log::warn!("voice start failed for {}: {}", key, error);
                    }
                    failed.push(VoiceFailure { key, error, retry });
                }
            }
        }

        TickReport {
            logical_time,
            stopped,
            started,
            failed,
            finished: logical_time > store.duration(),
        }
    }

    pub fn release_all(&mut self, voices: &dyn VoicePort) -> Vec<NoteKey> {
        self.failing.clear();
        self.sounding.release_all(voices)
    }

    /// Per-note view for the renderer. `audible` is false while the transport is stopped.
    pub fn project(
        &self,
        logical_time: Seconds,
        store: &NoteStore,
        mutes: &MuteController,
        audible: bool,
    ) -> Vec<NoteView> {
        store
            .notes()
            .iter()
            .map(|note| NoteView {
                key: note.key(),
                track_index: note.track_index,
                label: note_label(note.pitch),
                is_playing: audible && should_sound(note, logical_time, mutes),
            })
            .collect()
    }
}
