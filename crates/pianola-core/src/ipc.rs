use pianola_ports::playback::{PausePolicy, TransportState};
use pianola_ports::types::{
    AudioOutputDevice, DeviceId, Gain01, NoteEvent, NoteKey, Seconds, TrackIndex,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    ListAudioOutputs,
    SelectAudioOutput { device_id: DeviceId },
    SetMasterGain { gain: Gain01 },
    SetPausePolicy { policy: PausePolicy },
    Load { notes: Vec<NoteEvent> },
    Play,
    Pause,
    Reset,
    Seek { position: Seconds },
    ToggleMute { track: TrackIndex },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Ready,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    AudioOutputsUpdated { devices: Vec<AudioOutputDevice> },
    SessionStateUpdated { state: SessionState },
    SessionFailed { reason: String },
    NotesLoaded {
        note_count: usize,
        track_count: u32,
        duration: Seconds,
    },
    TransportUpdated {
        state: TransportState,
        logical_time: Seconds,
        duration: Seconds,
    },
    TrackMuteChanged { track: TrackIndex, muted: bool },
    VoiceStartFailed { key: NoteKey, reason: String },
    CommandRejected { reason: String },
    PlaybackFinished,
}
