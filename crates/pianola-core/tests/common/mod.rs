#![allow(dead_code)]

use parking_lot::Mutex;
use pianola_ports::types::{NoteEvent, Pitch, TrackIndex};
use pianola_ports::voice::{VoiceError, VoiceHandle, VoicePort, VoiceRequest};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Call {
    Start(Pitch, VoiceHandle),
    Stop(VoiceHandle),
}

/// Records every backend call in order and hands out sequential handles.
#[derive(Default)]
pub struct RecordingVoices {
    calls: Mutex<Vec<Call>>,
    next_handle: Mutex<u64>,
    failing: Mutex<BTreeSet<Pitch>>,
}

impl RecordingVoices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_pitch(&self, pitch: Pitch) {
        self.failing.lock().insert(pitch);
    }

    pub fn heal_pitch(&self, pitch: Pitch) {
        self.failing.lock().remove(&pitch);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock())
    }

    pub fn starts(&self) -> Vec<Pitch> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Start(pitch, _) => Some(pitch),
                Call::Stop(_) => None,
            })
            .collect()
    }

    pub fn stops(&self) -> Vec<VoiceHandle> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Stop(handle) => Some(handle),
                Call::Start(..) => None,
            })
            .collect()
    }
}

impl VoicePort for RecordingVoices {
    fn start(&self, request: VoiceRequest) -> Result<VoiceHandle, VoiceError> {
        if self.failing.lock().contains(&request.pitch) {
            return Err(VoiceError::Exhausted(0));
        }
        let handle = {
            let mut next = self.next_handle.lock();
            *next += 1;
            VoiceHandle(*next)
        };
        self.calls.lock().push(Call::Start(request.pitch, handle));
        Ok(handle)
    }

    fn stop(&self, handle: VoiceHandle) {
        self.calls.lock().push(Call::Stop(handle));
    }
}

pub fn note(pitch: Pitch, start_time: f64, duration: f64, track_index: TrackIndex) -> NoteEvent {
    NoteEvent {
        pitch,
        start_time,
        duration,
        velocity: 0.8,
        track_index,
    }
}

/// Seconds of logical time to host milliseconds from a zero origin.
pub fn ms(seconds: f64) -> f64 {
    seconds * 1000.0
}
