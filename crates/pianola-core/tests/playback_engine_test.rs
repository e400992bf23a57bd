mod common;

use common::{ms, note, Call, RecordingVoices};
use pianola_core::PlaybackEngine;
use pianola_ports::playback::{PausePolicy, PlaybackError, PlaybackPort, TransportState};
use pianola_ports::voice::VoiceHandle;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn engine_with(policy: PausePolicy) -> (PlaybackEngine, Arc<RecordingVoices>) {
    let engine = PlaybackEngine::new(policy);
    let voices = Arc::new(RecordingVoices::new());
    engine.attach_voices(voices.clone());
    (engine, voices)
}

fn two_track_notes() -> Vec<pianola_ports::types::NoteEvent> {
    vec![note(60, 1.0, 2.0, 0), note(64, 0.0, 4.0, 1)]
}

#[test]
fn play_requires_loaded_notes() {
    let (engine, _voices) = engine_with(PausePolicy::Silence);
    assert_eq!(engine.play(0.0), Err(PlaybackError::NothingLoaded));
    assert_eq!(engine.state(), TransportState::Stopped);
}

#[test]
fn play_requires_a_voice_backend() {
    let engine = PlaybackEngine::default();
    engine.load(two_track_notes()).expect("load");

    assert!(matches!(
        engine.play(0.0),
        Err(PlaybackError::BackendUnavailable(_))
    ));
}

#[test]
fn ticks_do_nothing_unless_playing() {
    let (engine, voices) = engine_with(PausePolicy::Silence);
    engine.load(two_track_notes()).expect("load");

    let report = engine.tick(ms(1.5));
    assert!(report.is_idle());
    assert!(voices.calls().is_empty());
}

#[test]
fn pause_with_silence_releases_sounding_voices() {
    let (engine, voices) = engine_with(PausePolicy::Silence);
    engine
        .load(vec![note(60, 1.0, 2.0, 0)])
        .expect("load");

    engine.play(0.0).expect("play");
    engine.tick(ms(1.5));
    engine.pause().expect("pause");
    engine.tick(ms(1.6));

    assert_eq!(
        voices.calls(),
        vec![Call::Start(60, VoiceHandle(1)), Call::Stop(VoiceHandle(1))]
    );
    assert_eq!(engine.state(), TransportState::Paused);
}

#[test]
fn pause_with_ring_out_leaves_voices_running() {
    let (engine, voices) = engine_with(PausePolicy::RingOut);
    engine.load(vec![note(60, 1.0, 2.0, 0)]).expect("load");

    engine.play(0.0).expect("play");
    engine.tick(ms(1.5));
    engine.pause().expect("pause");

    assert_eq!(voices.stops(), Vec::<VoiceHandle>::new());
    assert_eq!(engine.sounding_keys().len(), 1);
}

#[test]
fn resume_after_ring_out_pause_restarts_notes_still_in_their_interval() {
    let (engine, voices) = engine_with(PausePolicy::RingOut);
    engine.load(vec![note(60, 0.0, 4.0, 0)]).expect("load");

    engine.play(0.0).expect("play");
    engine.tick(ms(1.0));
    engine.pause().expect("pause");

    // the backend voice runs out its hold long before the resume
    engine.play(ms(61.0)).expect("resume");
    let report = engine.tick(ms(62.0));

    assert_eq!(report.started, vec![note(60, 0.0, 4.0, 0).key()]);
    assert_eq!(
        voices.calls(),
        vec![
            Call::Start(60, VoiceHandle(1)),
            Call::Stop(VoiceHandle(1)),
            Call::Start(60, VoiceHandle(2)),
        ]
    );
    assert_eq!(engine.sounding_keys().len(), 1);
}

#[test]
fn pause_is_rejected_unless_playing() {
    let (engine, voices) = engine_with(PausePolicy::Silence);
    assert_eq!(engine.pause(), Err(PlaybackError::NotPlaying));

    engine.load(vec![note(60, 0.0, 4.0, 0)]).expect("load");
    engine.play(0.0).expect("play");
    engine.tick(ms(1.0));
    engine.pause().expect("pause");

    assert_eq!(engine.pause(), Err(PlaybackError::NotPlaying));
    assert_eq!(engine.state(), TransportState::Paused);
    assert_eq!(voices.stops(), vec![VoiceHandle(1)]);
}

#[test]
fn resume_after_pause_continues_from_the_paused_position() {
    let (engine, voices) = engine_with(PausePolicy::Silence);
    engine.load(vec![note(60, 1.0, 2.0, 0)]).expect("load");

    engine.play(0.0).expect("play");
    engine.tick(ms(1.5));
    engine.pause().expect("pause");

    engine.play(10_000.0).expect("resume");
    let report = engine.tick(10_100.0);
    assert!((report.logical_time - 1.6).abs() < 1e-9);
    assert_eq!(voices.starts(), vec![60, 60]);
}

#[test]
fn reset_stops_everything_and_rewinds() {
    let (engine, voices) = engine_with(PausePolicy::Silence);
    engine.load(two_track_notes()).expect("load");

    engine.play(0.0).expect("play");
    engine.tick(ms(1.5));
    engine.reset().expect("reset");

    assert_eq!(voices.stops().len(), 2);
    assert!(engine.sounding_keys().is_empty());
    assert_eq!(engine.state(), TransportState::Stopped);
    assert_eq!(engine.logical_time(), 0.0);
}

#[test]
fn seek_back_while_playing_retriggers() {
    let (engine, voices) = engine_with(PausePolicy::Silence);
    engine.load(vec![note(60, 1.0, 2.0, 0)]).expect("load");

    engine.play(0.0).expect("play");
    engine.tick(ms(1.5));
    engine.tick(ms(3.5));
    engine.seek(1.2, ms(3.5)).expect("seek");
    engine.tick(ms(3.6));

    assert_eq!(voices.starts(), vec![60, 60]);
    assert_eq!(voices.stops(), vec![VoiceHandle(1)]);
}

#[test]
fn replaying_after_reset_starts_the_same_note_again() {
    let (engine, voices) = engine_with(PausePolicy::Silence);
    engine.load(vec![note(60, 1.0, 2.0, 0)]).expect("load");

    engine.play(0.0).expect("play");
    engine.tick(ms(1.5));
    engine.pause().expect("pause");
    engine.reset().expect("reset");
    engine.play(ms(10.0)).expect("replay");
    let report = engine.tick(ms(11.5));

    assert_eq!(report.started, vec![note(60, 1.0, 2.0, 0).key()]);
    assert_eq!(
        voices.calls(),
        vec![
            Call::Start(60, VoiceHandle(1)),
            Call::Stop(VoiceHandle(1)),
            Call::Start(60, VoiceHandle(2)),
        ]
    );
}

#[test]
fn seek_from_stopped_pauses_at_position() {
    let (engine, voices) = engine_with(PausePolicy::Silence);
    engine.load(two_track_notes()).expect("load");

    engine.seek(2.0, 0.0).expect("seek");
    engine.tick(ms(1.0));

    assert_eq!(engine.state(), TransportState::Paused);
    assert_eq!(engine.logical_time(), 2.0);
    assert!(voices.calls().is_empty());
}

#[test]
fn toggle_mute_checks_track_range() {
    let (engine, _voices) = engine_with(PausePolicy::Silence);
    assert_eq!(
        engine.toggle_mute(0),
        Err(PlaybackError::TrackOutOfRange {
            track: 0,
            track_count: 0
        })
    );

    engine.load(two_track_notes()).expect("load");
    assert_eq!(
        engine.toggle_mute(2),
        Err(PlaybackError::TrackOutOfRange {
            track: 2,
            track_count: 2
        })
    );
    assert_eq!(engine.toggle_mute(1), Ok(true));
    assert_eq!(engine.toggle_mute(1), Ok(false));
}

#[test]
fn mute_while_playing_stops_the_track_immediately() {
    let (engine, voices) = engine_with(PausePolicy::Silence);
    engine.load(two_track_notes()).expect("load");

    engine.play(0.0).expect("play");
    engine.tick(ms(1.5));
    voices.take_calls();

    // pitch 64 on track 1 starts first, so it holds handle 1
    engine.toggle_mute(1).expect("mute");
    assert_eq!(voices.take_calls(), vec![Call::Stop(VoiceHandle(1))]);

    engine.tick(ms(1.6));
    assert!(voices.calls().is_empty());
    assert!(engine.is_muted(1));
}

#[test]
fn mutes_survive_reset_and_reload() {
    let (engine, _voices) = engine_with(PausePolicy::Silence);
    engine.load(two_track_notes()).expect("load");
    engine.toggle_mute(0).expect("mute");

    engine.reset().expect("reset");
    engine.load(two_track_notes()).expect("reload");

    assert_eq!(engine.render_view().muted_tracks, vec![0]);
}

#[test]
fn failed_load_stops_playback_and_keeps_the_previous_notes() {
    let (engine, voices) = engine_with(PausePolicy::Silence);
    engine.load(vec![note(60, 0.0, 4.0, 0)]).expect("load");
    engine.play(0.0).expect("play");
    engine.tick(ms(1.5));

    let err = engine.load(Vec::new()).unwrap_err();
    assert!(matches!(err, PlaybackError::InvalidNotes(_)));

    assert_eq!(engine.state(), TransportState::Stopped);
    assert_eq!(engine.logical_time(), 0.0);
    assert_eq!(voices.stops(), vec![VoiceHandle(1)]);
    assert!(engine.sounding_keys().is_empty());
    assert_eq!(engine.note_count(), Some(1));

    engine.play(ms(5.0)).expect("previous notes still play");
}

#[test]
fn invalid_notes_are_rejected_before_anything_is_replaced() {
    let (engine, _voices) = engine_with(PausePolicy::Silence);
    engine.load(two_track_notes()).expect("load");

    let err = engine.load(vec![note(60, 0.0, -1.0, 0)]).unwrap_err();
    assert!(matches!(err, PlaybackError::InvalidNotes(_)));
    assert_eq!(engine.note_count(), Some(2));
    assert_eq!(engine.track_count(), Some(2));
}

#[test]
fn loading_resets_the_transport() {
    let (engine, voices) = engine_with(PausePolicy::Silence);
    engine.load(two_track_notes()).expect("load");
    engine.play(0.0).expect("play");
    engine.tick(ms(1.5));

    engine.load(vec![note(72, 0.0, 1.0, 0)]).expect("reload");

    assert_eq!(engine.state(), TransportState::Stopped);
    assert_eq!(engine.logical_time(), 0.0);
    assert_eq!(voices.stops().len(), 2);
    assert_eq!(engine.track_count(), Some(1));
}

#[test]
fn detaching_voices_stops_playback() {
    let (engine, voices) = engine_with(PausePolicy::Silence);
    engine.load(two_track_notes()).expect("load");
    engine.play(0.0).expect("play");
    engine.tick(ms(0.5));

    engine.detach_voices();

    assert_eq!(voices.stops(), vec![VoiceHandle(1)]);
    assert!(!engine.has_voices());
    assert_eq!(engine.state(), TransportState::Stopped);
}

#[test]
fn render_view_reports_playing_notes_only_while_running() {
    let (engine, _voices) = engine_with(PausePolicy::Silence);
    engine.load(two_track_notes()).expect("load");

    let stopped = engine.render_view();
    assert_eq!(stopped.state, TransportState::Stopped);
    assert_eq!(stopped.duration, 4.0);
    assert!(stopped.notes.iter().all(|view| !view.is_playing));

    engine.play(0.0).expect("play");
    engine.tick(ms(0.5));
    let playing: Vec<bool> = engine
        .render_view()
        .notes
        .iter()
        .map(|view| view.is_playing)
        .collect();
    // store order: pitch 64 starts at 0.0, pitch 60 at 1.0
    assert_eq!(playing, vec![true, false]);
}
