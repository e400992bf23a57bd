use clap::{Parser, ValueEnum};
use pianola_core::{AppCore, AppError, Command, Event};
use pianola_domain_notes::{import_note_list_path, NoteImportError};
use pianola_infra_audio_cpal::CpalAudioOutputPort;
use pianola_infra_storage_fs::FsStorage;
use pianola_infra_synth_simple::SimpleSynth;
use pianola_ports::audio::{AudioError, AudioOutputPort};
use pianola_ports::playback::PausePolicy;
use pianola_ports::storage::{SettingsDto, StoragePort};
use pianola_ports::types::{DeviceId, TrackIndex};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about = "Plays a note list through the default audio output", long_about = None)]
struct Cli {
    /// JSON note list: `{ "tracks": [{ "notes": [{ "midi", "time", "duration", "velocity" }] }] }`.
    #[arg(required_unless_present = "list_devices")]
    notes: Option<PathBuf>,
    /// Track to mute before playback starts. Repeatable.
    #[arg(long = "mute", value_name = "TRACK")]
    mutes: Vec<TrackIndex>,
    /// Ticks per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Output device id as printed by `--list-devices`.
    #[arg(long)]
    device: Option<String>,
    /// Print the available output devices and exit.
    #[arg(long)]
    list_devices: bool,
    /// Directory holding settings.json.
    #[arg(long, value_name = "DIR")]
    settings_dir: Option<PathBuf>,
    #[arg(long, value_enum)]
    pause_policy: Option<PausePolicyArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PausePolicyArg {
    Silence,
    RingOut,
}

impl From<PausePolicyArg> for PausePolicy {
    fn from(arg: PausePolicyArg) -> Self {
        match arg {
            PausePolicyArg::Silence => PausePolicy::Silence,
            PausePolicyArg::RingOut => PausePolicy::RingOut,
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Import(#[from] NoteImportError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Audio(#[from] AudioError),
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let audio_port = CpalAudioOutputPort::new();
    if cli.list_devices {
        for device in audio_port.list_outputs()? {
            println!(
                "{}\t{} ({} Hz)",
                device.id, device.name, device.default_config.sample_rate_hz
            );
        }
        return Ok(());
    }

    let storage = match cli.settings_dir.clone() {
        Some(dir) => FsStorage::new(dir),
        None => FsStorage::default(),
    };
    let settings = effective_settings(&storage, &cli);
    let synth = SimpleSynth::new(settings.max_voices);

    let mut core = AppCore::with_settings(
        Box::new(audio_port),
        Box::new(synth),
        Some(Box::new(storage)),
        settings,
    );
    core.start_session()?;

    let Some(path) = cli.notes.as_deref() else {
        return Ok(());
    };
    let notes = import_note_list_path(path)?;
    log::info!("read {} notes from {}", notes.len(), path.display());

    let clock = Instant::now();
    let now_ms = || clock.elapsed().as_secs_f64() * 1000.0;

    core.handle_command(Command::Load { notes }, now_ms())?;
    for track in &cli.mutes {
        core.handle_command(Command::ToggleMute { track: *track }, now_ms())?;
    }
    core.handle_command(Command::Play, now_ms())?;

    let frame = Duration::from_secs_f64(1.0 / f64::from(cli.fps.max(1)));
    'frames: loop {
        core.tick(now_ms());
        for event in core.drain_events() {
            log_event(&event);
            if matches!(event, Event::PlaybackFinished | Event::SessionFailed { .. }) {
                break 'frames;
            }
        }
        std::thread::sleep(frame);
    }

    core.shutdown();
    Ok(())
}

/// Stored settings with this run's command-line overrides applied. Overrides are not saved.
fn effective_settings(storage: &FsStorage, cli: &Cli) -> SettingsDto {
    let mut settings = storage.load_settings().unwrap_or_else(|err| {
        log::warn!("settings unreadable, using defaults: {}", err);
        SettingsDto::default()
    });
    if let Some(device) = cli.device.clone() {
        settings.selected_audio_out = Some(DeviceId(device));
    }
    if let Some(policy) = cli.pause_policy {
        settings.pause_policy = policy.into();
    }
    settings
}

fn log_event(event: &Event) {
    match event {
        Event::TransportUpdated {
            state,
            logical_time,
            duration,
        } => log::debug!("{:?} {:.2}s / {:.2}s", state, logical_time, duration),
        Event::NotesLoaded {
            note_count,
            track_count,
            duration,
        } => log::info!(
            "{} notes on {} track(s), {:.2}s",
            note_count,
            track_count,
            duration
        ),
        Event::TrackMuteChanged { track, muted } => {
            log::info!("track {} {}", track, if *muted { "muted" } else { "unmuted" })
        }
        Event::VoiceStartFailed { key, reason } => log::warn!("{}: {}", key, reason),
        Event::SessionFailed { reason } => log::error!("audio session failed: {}", reason),
        Event::CommandRejected { reason } => log::warn!("rejected: {}", reason),
        Event::PlaybackFinished => log::info!("finished"),
        Event::SessionStateUpdated { state } => log::debug!("session {:?}", state),
        Event::AudioOutputsUpdated { devices } => log::debug!("{} output(s)", devices.len()),
    }
}
