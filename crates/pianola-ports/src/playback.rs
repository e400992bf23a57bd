use crate::types::*;
use crate::voice::{VoiceError, VoicePort};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PausePolicy {
    /// Release every sounding voice when the transport pauses.
    #[default]
    Silence,
    /// Leave voices to finish their own duration.
    RingOut,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteView {
    pub key: NoteKey,
    pub track_index: TrackIndex,
    pub label: String,
    pub is_playing: bool,
}

/// Snapshot for the external renderer. Derived on demand, never written back into the notes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderView {
    pub state: TransportState,
    pub logical_time: Seconds,
    pub duration: Seconds,
    pub muted_tracks: Vec<TrackIndex>,
    pub notes: Vec<NoteView>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VoiceFailure {
    pub key: NoteKey,
    pub error: VoiceError,
    /// The same note instance already failed on an earlier tick.
    pub retry: bool,
}

/// Side effects issued by one tick, in call order within each list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub logical_time: Seconds,
    pub stopped: Vec<NoteKey>,
    pub started: Vec<NoteKey>,
    pub failed: Vec<VoiceFailure>,
    pub finished: bool,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.stopped.is_empty() && self.started.is_empty() && self.failed.is_empty()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("invalid note list: {0}")]
    InvalidNotes(String),
    #[error("nothing loaded")]
    NothingLoaded,
    #[error("transport is not playing")]
    NotPlaying,
    #[error("track {track} out of range ({track_count} tracks loaded)")]
    TrackOutOfRange {
        track: TrackIndex,
        track_count: u32,
    },
    #[error("audio backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Transport commands plus the per-frame tick. Wall-clock readings are supplied by the host.
pub trait PlaybackPort: Send + Sync {
    fn attach_voices(&self, voices: Arc<dyn VoicePort>);
    fn detach_voices(&self);

    fn load(&self, notes: Vec<NoteEvent>) -> Result<(), PlaybackError>;

    fn play(&self, now_ms: WallClockMs) -> Result<(), PlaybackError>;
    fn pause(&self) -> Result<(), PlaybackError>;
    fn reset(&self) -> Result<(), PlaybackError>;
    fn seek(&self, position: Seconds, now_ms: WallClockMs) -> Result<(), PlaybackError>;

    /// Returns whether the track is muted afterwards.
    fn toggle_mute(&self, track: TrackIndex) -> Result<bool, PlaybackError>;
    fn set_pause_policy(&self, policy: PausePolicy);

    fn tick(&self, now_ms: WallClockMs) -> TickReport;
    fn state(&self) -> TransportState;
    fn render_view(&self) -> RenderView;
}
