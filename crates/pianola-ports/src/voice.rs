use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum VoiceError {
    #[error("voices exhausted ({0} active)")]
    Exhausted(usize),
    #[error("command queue full")]
    QueueFull,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Opaque token for one sounding voice, issued by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoiceHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceRequest {
    pub pitch: Pitch,
    pub duration_ms: f64,
    pub gain: Gain01,
}

impl VoiceRequest {
    pub fn for_note(note: &NoteEvent) -> Self {
        Self {
            pitch: note.pitch,
            duration_ms: note.duration * 1000.0,
            gain: Gain01::new(note.velocity),
        }
    }
}

/// Audio backend adapter.
///
/// Both calls are non-blocking requests made from the control thread. `stop` on a handle
/// the backend already released (e.g. the voice ran out its duration) is a no-op.
pub trait VoicePort: Send + Sync {
    fn start(&self, request: VoiceRequest) -> Result<VoiceHandle, VoiceError>;
    fn stop(&self, handle: VoiceHandle);
}
