use crate::audio_graph::AudioGraph;
use crate::audio_params::AudioParams;
use crate::ipc::{Command, Event, SessionState};
use crate::playback_engine::PlaybackEngine;
use pianola_ports::audio::{AudioError, AudioOutputPort, AudioStreamHandle};
use pianola_ports::playback::{PlaybackError, PlaybackPort, RenderView, TransportState};
use pianola_ports::storage::{SettingsDto, StorageError, StoragePort};
use pianola_ports::synth::{SynthError, SynthPort};
use pianola_ports::types::{AudioConfig, DeviceId, WallClockMs};
use std::collections::VecDeque;
use std::sync::Arc;

const TRANSPORT_EMIT_INTERVAL_MS: WallClockMs = 33.0;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("synth error: {0}")]
    Synth(#[from] SynthError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("playback error: {0}")]
    Playback(#[from] PlaybackError),
    #[error("audio session failed: {0}")]
    SessionFailed(String),
}

/// One player session: owns the audio stream and the synth voices for its whole lifetime.
///
/// A session that fails to open stays failed; the transport cannot leave `Stopped` afterwards.
pub struct AppCore {
    audio_port: Box<dyn AudioOutputPort>,
    synth: Box<dyn SynthPort>,
    storage: Option<Box<dyn StoragePort>>,
    settings: SettingsDto,
    session_state: SessionState,
    session_failure: Option<String>,
    playback: PlaybackEngine,
    audio_params: Arc<AudioParams>,
    audio_stream: Option<Box<dyn AudioStreamHandle>>,
    events: VecDeque<Event>,
    last_transport_emit: Option<WallClockMs>,
    finish_reported: bool,
}

impl AppCore {
    pub fn new(
        audio_port: Box<dyn AudioOutputPort>,
        synth: Box<dyn SynthPort>,
        storage: Option<Box<dyn StoragePort>>,
    ) -> Self {
        let settings = match storage.as_ref().map(|storage| storage.load_settings()) {
            Some(Ok(settings)) => settings,
            Some(Err(err)) => {
                log::warn!("settings unreadable, using defaults: {}", err);
                SettingsDto::default()
            }
            None => SettingsDto::default(),
        };
        Self::with_settings(audio_port, synth, storage, settings)
    }

    pub fn with_settings(
        audio_port: Box<dyn AudioOutputPort>,
        synth: Box<dyn SynthPort>,
        storage: Option<Box<dyn StoragePort>>,
        settings: SettingsDto,
    ) -> Self {
        let audio_params = Arc::new(AudioParams::new(&settings));
        let playback = PlaybackEngine::new(settings.pause_policy);

        Self {
            audio_port,
            synth,
            storage,
            settings,
            session_state: SessionState::Idle,
            session_failure: None,
            playback,
            audio_params,
            audio_stream: None,
            events: VecDeque::new(),
            last_transport_emit: None,
            finish_reported: false,
        }
    }

    pub fn settings(&self) -> &SettingsDto {
        &self.settings
    }

    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    pub fn playback(&self) -> &PlaybackEngine {
        &self.playback
    }

    pub fn render_view(&self) -> RenderView {
        self.playback.render_view()
    }

    /// Opens the configured output, falling back to the system default device.
    pub fn start_session(&mut self) -> Result<(), AppError> {
        if let Some(reason) = self.session_failure.as_ref() {
            return Err(AppError::SessionFailed(reason.clone()));
        }
        let device_id = match self.settings.selected_audio_out.clone() {
            Some(device_id) => device_id,
            None => match self.audio_port.default_output() {
                Ok(device_id) => device_id,
                Err(err) => return Err(self.fail_session(err.into())),
            },
        };
        self.open_session(device_id)
    }

    pub fn handle_command(&mut self, cmd: Command, now_ms: WallClockMs) -> Result<(), AppError> {
        let result = self.apply_command(cmd, now_ms);
        if let Err(err @ (AppError::Playback(_) | AppError::SessionFailed(_))) = &result {
            log::warn!("command rejected: {}", err);
            self.events.push_back(Event::CommandRejected {
                reason: err.to_string(),
            });
        }
        result
    }

    pub fn tick(&mut self, now_ms: WallClockMs) {
        let report = self.playback.tick(now_ms);

        for failure in report.failed.iter().filter(|failure| !failure.retry) {
            self.events.push_back(Event::VoiceStartFailed {
                key: failure.key,
                reason: failure.error.to_string(),
            });
        }

        if report.finished
            && !self.finish_reported
            && self.playback.state() == TransportState::Playing
        {
            self.finish_reported = true;
            if self.settings.stop_at_end {
                self.playback.reset().ok();
            }
            log::info!("playback finished at {:.2}s", report.logical_time);
            self.events.push_back(Event::PlaybackFinished);
            self.emit_transport(now_ms, true);
            return;
        }

        self.emit_transport(now_ms, false);
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// Releases every voice and closes the audio device.
    pub fn shutdown(&mut self) {
        self.close_session();
        if self.session_state == SessionState::Ready {
            self.session_state = SessionState::Idle;
            self.emit_session_state();
        }
        log::info!("session closed");
    }

    fn apply_command(&mut self, cmd: Command, now_ms: WallClockMs) -> Result<(), AppError> {
        if matches!(
            cmd,
            Command::Load { .. } | Command::Play | Command::Reset | Command::Seek { .. }
        ) {
            self.finish_reported = false;
        }
        match cmd {
            Command::ListAudioOutputs => {
                let devices = self.audio_port.list_outputs()?;
                self.events.push_back(Event::AudioOutputsUpdated { devices });
            }
            Command::SelectAudioOutput { device_id } => {
                if let Some(reason) = self.session_failure.as_ref() {
                    return Err(AppError::SessionFailed(reason.clone()));
                }
                self.open_session(device_id)?;
                self.save_settings();
            }
            Command::SetMasterGain { gain } => {
                self.settings.master_gain = gain;
                self.audio_params.set_master(gain);
                self.save_settings();
            }
            Command::SetPausePolicy { policy } => {
                self.settings.pause_policy = policy;
                self.playback.set_pause_policy(policy);
                self.save_settings();
            }
            Command::Load { notes } => {
                let loaded = self.playback.load(notes);
                self.emit_transport(now_ms, true);
                loaded?;
                self.events.push_back(Event::NotesLoaded {
                    note_count: self.playback.note_count().unwrap_or(0),
                    track_count: self.playback.track_count().unwrap_or(0),
                    duration: self.playback.duration().unwrap_or(0.0),
                });
            }
            Command::Play => {
                if let Some(reason) = self.session_failure.as_ref() {
                    return Err(PlaybackError::BackendUnavailable(reason.clone()).into());
                }
                self.playback.play(now_ms)?;
                self.emit_transport(now_ms, true);
            }
            Command::Pause => {
                self.playback.pause()?;
                self.emit_transport(now_ms, true);
            }
            Command::Reset => {
                self.playback.reset()?;
                self.emit_transport(now_ms, true);
            }
            Command::Seek { position } => {
                self.playback.seek(position, now_ms)?;
                self.emit_transport(now_ms, true);
            }
            Command::ToggleMute { track } => {
                let muted = self.playback.toggle_mute(track)?;
                self.events.push_back(Event::TrackMuteChanged { track, muted });
            }
        }
        Ok(())
    }

    fn open_session(&mut self, device_id: DeviceId) -> Result<(), AppError> {
        self.close_session();
        match self.open_output(device_id) {
            Ok(()) => {
                self.session_state = SessionState::Ready;
                self.emit_session_state();
                Ok(())
            }
            Err(err) => Err(self.fail_session(err)),
        }
    }

    fn open_output(&mut self, device_id: DeviceId) -> Result<(), AppError> {
        let config = AudioConfig {
            sample_rate_hz: self.settings.sample_rate_hz,
            channels: 2,
            buffer_size_frames: self.settings.audio_buffer_size_frames,
        };

        let instance = self.synth.instantiate(config.sample_rate_hz)?;
        let graph = AudioGraph::new(instance.renderer, self.audio_params.clone());
        let stream = self
            .audio_port
            .open_output(&device_id, config, Box::new(graph))?;

        log::info!(
            "audio session open on {} at {} Hz",
            device_id,
            config.sample_rate_hz
        );
        self.audio_stream = Some(stream);
        self.playback.attach_voices(instance.voices);
        self.settings.selected_audio_out = Some(device_id);
        Ok(())
    }

    fn fail_session(&mut self, err: AppError) -> AppError {
        let reason = err.to_string();
        log::error!("audio session failed: {}", reason);
        self.session_failure = Some(reason.clone());
        self.session_state = SessionState::Failed;
        self.events.push_back(Event::SessionFailed { reason });
        self.emit_session_state();
        err
    }

    fn close_session(&mut self) {
        self.playback.detach_voices();
        if let Some(stream) = self.audio_stream.take() {
            stream.close();
        }
    }

    fn emit_session_state(&mut self) {
        self.events.push_back(Event::SessionStateUpdated {
            state: self.session_state,
        });
    }

    fn emit_transport(&mut self, now_ms: WallClockMs, force: bool) {
        if let Some(last) = self.last_transport_emit {
            if !force && now_ms - last < TRANSPORT_EMIT_INTERVAL_MS {
                return;
            }
        }
        self.events.push_back(Event::TransportUpdated {
            state: self.playback.state(),
            logical_time: self.playback.logical_time(),
            duration: self.playback.duration().unwrap_or(0.0),
        });
        self.last_transport_emit = Some(now_ms);
    }

    fn save_settings(&self) {
        if let Some(storage) = self.storage.as_ref() {
            if let Err(err) = storage.save_settings(&self.settings) {
                log::warn!("failed to save settings: {}", err);
            }
        }
    }
}

impl Drop for AppCore {
    fn drop(&mut self) {
        self.close_session();
    }
}
