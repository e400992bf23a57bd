use crate::sounding::SoundingSet;
use pianola_ports::types::{NoteKey, TrackIndex};
use pianola_ports::voice::VoicePort;
use std::collections::BTreeSet;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MuteChange {
    pub track: TrackIndex,
    pub muted: bool,
    /// Sounding notes stopped by this change, in stop order.
    pub silenced: Vec<NoteKey>,
}

/// Muted track indices. Mutes outlive resets and loads.
#[derive(Clone, Debug, Default)]
pub struct MuteController {
    muted: BTreeSet<TrackIndex>,
}

impl MuteController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_muted(&self, track: TrackIndex) -> bool {
        self.muted.contains(&track)
    }

    pub fn muted_tracks(&self) -> Vec<TrackIndex> {
        self.muted.iter().copied().collect()
    }

    pub fn toggle(
        &mut self,
        track: TrackIndex,
        sounding: &mut SoundingSet,
        voices: Option<&dyn VoicePort>,
    ) -> MuteChange {
        let muted = !self.is_muted(track);
        self.set_muted(track, muted, sounding, voices)
    }

    /// Setting the current value again changes nothing. Muting stops the track's sounding
    /// notes before returning; unmuting leaves re-entry to the next tick.
    pub fn set_muted(
        &mut self,
        track: TrackIndex,
        muted: bool,
        sounding: &mut SoundingSet,
        voices: Option<&dyn VoicePort>,
    ) -> MuteChange {
        let changed = if muted {
            self.muted.insert(track)
        } else {
            self.muted.remove(&track)
        };

        let silenced = match voices {
            Some(voices) if changed && muted => sounding.release_track(voices, track),
            _ => Vec::new(),
        };

        MuteChange {
            track,
            muted,
            silenced,
        }
    }
}
