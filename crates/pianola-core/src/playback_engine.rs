use crate::mute::MuteController;
use crate::scheduler::Scheduler;
use crate::transport::Transport;
use pianola_domain_notes::NoteStore;
use pianola_ports::playback::{
    PausePolicy, PlaybackError, PlaybackPort, RenderView, TickReport, TransportState,
};
use pianola_ports::types::{NoteEvent, NoteKey, Seconds, TrackIndex, WallClockMs};
use pianola_ports::voice::VoicePort;
use parking_lot::Mutex;
use std::sync::Arc;

struct PlaybackState {
    transport: Transport,
    scheduler: Scheduler,
    mutes: MuteController,
    store: Option<NoteStore>,
    voices: Option<Arc<dyn VoicePort>>,
    pause_policy: PausePolicy,
}

pub struct PlaybackEngine {
    state: Mutex<PlaybackState>,
}

impl PlaybackEngine {
    pub fn new(pause_policy: PausePolicy) -> Self {
        Self {
            state: Mutex::new(PlaybackState {
                transport: Transport::new(),
                scheduler: Scheduler::new(),
                mutes: MuteController::new(),
                store: None,
                voices: None,
                pause_policy,
            }),
        }
    }

    pub fn logical_time(&self) -> Seconds {
        self.state.lock().transport.logical_time()
    }

    pub fn duration(&self) -> Option<Seconds> {
        self.state.lock().store.as_ref().map(NoteStore::duration)
    }

    pub fn note_count(&self) -> Option<usize> {
        self.state.lock().store.as_ref().map(NoteStore::len)
    }

    pub fn track_count(&self) -> Option<u32> {
        self.state.lock().store.as_ref().map(NoteStore::track_count)
    }

    pub fn sounding_keys(&self) -> Vec<NoteKey> {
        let state = self.state.lock();
        state.scheduler.sounding().entries().map(|entry| entry.key).collect()
    }

    pub fn has_voices(&self) -> bool {
        self.state.lock().voices.is_some()
    }

    pub fn is_muted(&self, track: TrackIndex) -> bool {
        self.state.lock().mutes.is_muted(track)
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new(PausePolicy::default())
    }
}

impl PlaybackState {
    fn release_all(&mut self) -> Vec<NoteKey> {
        match self.voices.as_ref() {
            Some(voices) => self.scheduler.release_all(voices.as_ref()),
            None => Vec::new(),
        }
    }

    fn reset(&mut self) {
        let released = self.release_all();
        if !released.is_empty() {
            log::debug!("reset released {} voice(s)", released.len());
        }
        self.transport.reset();
    }
}

impl PlaybackPort for PlaybackEngine {
    fn attach_voices(&self, voices: Arc<dyn VoicePort>) {
        let mut state = self.state.lock();
        state.release_all();
        state.voices = Some(voices);
    }

    fn detach_voices(&self) {
        let mut state = self.state.lock();
        state.reset();
        state.voices = None;
    }

    /// Resets before validating. A rejected list leaves the transport stopped on the previous notes.
    fn load(&self, notes: Vec<NoteEvent>) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        state.reset();
        let store = NoteStore::new(notes).map_err(|e| PlaybackError::InvalidNotes(e.to_string()))?;
        log::info!(
            "loaded {} notes on {} track(s), {:.2}s",
            store.len(),
            store.track_count(),
            store.duration()
        );
        state.store = Some(store);
        Ok(())
    }

    fn play(&self, now_ms: WallClockMs) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        if state.store.is_none() {
            return Err(PlaybackError::NothingLoaded);
        }
        if state.voices.is_none() {
            return Err(PlaybackError::BackendUnavailable(
                "no audio session".to_string(),
            ));
        }
        if state.transport.state() == TransportState::Paused {
            // voices left ringing through the pause may have run out their hold
            let released = state.release_all();
            if !released.is_empty() {
                log::debug!("resume released {} ringing voice(s)", released.len());
            }
        }
        state.transport.play(now_ms);
        Ok(())
    }

    fn pause(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        if !state.transport.pause() {
            return Err(PlaybackError::NotPlaying);
        }
        if state.pause_policy == PausePolicy::Silence {
            state.release_all();
        }
        Ok(())
    }

    fn reset(&self) -> Result<(), PlaybackError> {
        self.state.lock().reset();
        Ok(())
    }

    fn seek(&self, position: Seconds, now_ms: WallClockMs) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        if state.store.is_none() {
            return Err(PlaybackError::NothingLoaded);
        }
        state.transport.seek(position, now_ms);
        Ok(())
    }

    fn toggle_mute(&self, track: TrackIndex) -> Result<bool, PlaybackError> {
        let mut state = self.state.lock();
        let track_count = state.store.as_ref().map_or(0, NoteStore::track_count);
        if track >= track_count {
            return Err(PlaybackError::TrackOutOfRange { track, track_count });
        }

        let PlaybackState {
            scheduler,
            mutes,
            voices,
            ..
        } = &mut *state;
        let change = mutes.toggle(track, scheduler.sounding_mut(), voices.as_deref());
        log::debug!(
            "track {} {} ({} voice(s) silenced)",
            track,
            if change.muted { "muted" } else { "unmuted" },
            change.silenced.len()
        );
        Ok(change.muted)
    }

    fn set_pause_policy(&self, policy: PausePolicy) {
        self.state.lock().pause_policy = policy;
    }

    fn tick(&self, now_ms: WallClockMs) -> TickReport {
        let mut state = self.state.lock();
        let logical_time = state.transport.advance_to(now_ms);
        if !state.transport.is_playing() {
            return TickReport {
                logical_time,
                ..TickReport::default()
            };
        }

        let PlaybackState {
            scheduler,
            mutes,
            store,
            voices,
            ..
        } = &mut *state;
        match (store.as_ref(), voices.as_ref()) {
            (Some(store), Some(voices)) => {
                scheduler.tick(logical_time, store, mutes, voices.as_ref())
            }
            _ => TickReport {
                logical_time,
                ..TickReport::default()
            },
        }
    }

    fn state(&self) -> TransportState {
        self.state.lock().transport.state()
    }

    fn render_view(&self) -> RenderView {
        let state = self.state.lock();
        let logical_time = state.transport.logical_time();
        let transport_state = state.transport.state();
        let (duration, notes) = match state.store.as_ref() {
            Some(store) => (
                store.duration(),
                state.scheduler.project(
                    logical_time,
                    store,
                    &state.mutes,
                    transport_state != TransportState::Stopped,
                ),
            ),
            None => (0.0, Vec::new()),
        };
        RenderView {
            state: transport_state,
            logical_time,
            duration,
            muted_tracks: state.mutes.muted_tracks(),
            notes,
        }
    }
}
