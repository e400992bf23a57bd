use serde::{Deserialize, Serialize};
use std::fmt;

pub type Pitch = u8; // MIDI note number 0..=127
pub type TrackIndex = u32;
pub type Seconds = f64; // logical playback time
pub type WallClockMs = f64; // host clock reading, milliseconds
pub type SampleTime = u64; // audio sample index, monotonic while stream running

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch: Pitch,
    pub start_time: Seconds,
    pub duration: Seconds,
    pub velocity: f32,
    pub track_index: TrackIndex,
}

impl NoteEvent {
    pub fn end_time(&self) -> Seconds {
        self.start_time + self.duration
    }

    /// Closed interval membership: `[start_time, start_time + duration]`.
    pub fn is_active_at(&self, logical_time: Seconds) -> bool {
        logical_time >= self.start_time && logical_time <= self.end_time()
    }

    pub fn key(&self) -> NoteKey {
        NoteKey {
            pitch: self.pitch,
            start_micros: seconds_to_micros(self.start_time),
            track_index: self.track_index,
        }
    }
}

/// Identity of one scheduled occurrence of a pitch.
///
/// The start time is quantized to whole microseconds so the key can be ordered and hashed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteKey {
    pub pitch: Pitch,
    pub start_micros: i64,
    pub track_index: TrackIndex,
}

impl NoteKey {
    pub fn start_time(&self) -> Seconds {
        self.start_micros as f64 / 1_000_000.0
    }
}

impl fmt::Display for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pitch {} @ {:.3}s track {}",
            self.pitch,
            self.start_time(),
            self.track_index
        )
    }
}

pub fn seconds_to_micros(seconds: Seconds) -> i64 {
    (seconds * 1_000_000.0).round() as i64
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioOutputDevice {
    pub id: DeviceId,
    pub name: String,
    pub default_config: AudioConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate_hz: u32,
    pub channels: u16, // fixed 2
    pub buffer_size_frames: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Gain01(pub f32);

impl Gain01 {
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
