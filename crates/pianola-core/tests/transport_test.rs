use pianola_core::{Transport, TransportClock};
use pianola_ports::playback::TransportState;
use pretty_assertions::assert_eq;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn playing_follows_the_wall_clock() {
    let mut transport = Transport::new();
    assert!(transport.play(10_000.0));

    assert!(approx(transport.advance_to(10_500.0), 0.5));
    assert!(approx(transport.advance_to(12_000.0), 2.0));
    assert_eq!(transport.state(), TransportState::Playing);
}

#[test]
fn pause_and_resume_keeps_position_without_drift() {
    let mut transport = Transport::new();
    transport.play(0.0);
    transport.advance_to(1_500.0);
    assert!(transport.pause());

    // wall clock keeps running while paused
    assert!(approx(transport.advance_to(9_000.0), 1.5));

    transport.play(20_000.0);
    assert!(approx(transport.advance_to(20_000.0), 1.5));
    assert!(approx(transport.advance_to(20_250.0), 1.75));
}

#[test]
fn play_while_playing_is_ignored() {
    let mut transport = Transport::new();
    transport.play(0.0);
    transport.advance_to(1_000.0);

    assert!(!transport.play(5_000.0));
    assert!(approx(transport.advance_to(2_000.0), 2.0));
}

#[test]
fn pause_only_applies_while_playing() {
    let mut transport = Transport::new();
    assert!(!transport.pause());
    assert_eq!(transport.state(), TransportState::Stopped);
}

#[test]
fn reset_returns_to_zero_and_stopped() {
    let mut transport = Transport::new();
    transport.play(0.0);
    transport.advance_to(3_000.0);
    transport.reset();

    assert_eq!(transport.state(), TransportState::Stopped);
    assert_eq!(transport.logical_time(), 0.0);
    assert!(!transport.clock().is_anchored());
}

#[test]
fn seek_from_stopped_becomes_paused() {
    let mut transport = Transport::new();
    transport.seek(4.0, 100.0);

    assert_eq!(transport.state(), TransportState::Paused);
    assert_eq!(transport.advance_to(5_000.0), 4.0);

    transport.play(10_000.0);
    assert!(approx(transport.advance_to(11_000.0), 5.0));
}

#[test]
fn seek_while_playing_reanchors() {
    let mut transport = Transport::new();
    transport.play(0.0);
    transport.advance_to(8_000.0);
    transport.seek(1.0, 8_000.0);

    assert_eq!(transport.state(), TransportState::Playing);
    assert!(approx(transport.advance_to(8_500.0), 1.5));
}

#[test]
fn seek_clamps_negative_positions() {
    let mut transport = Transport::new();
    transport.seek(-2.0, 0.0);
    assert_eq!(transport.logical_time(), 0.0);
}

#[test]
fn clock_never_runs_backwards_on_its_own() {
    let mut clock = TransportClock::new();
    clock.anchor(1_000.0);
    assert!(approx(clock.advance_to(3_000.0), 2.0));
    assert!(approx(clock.advance_to(2_000.0), 2.0));
}
