use pianola_infra_synth_simple::SimpleSynth;
use pianola_ports::synth::SynthPort;
use pianola_ports::types::Gain01;
use pianola_ports::voice::{VoiceError, VoiceHandle, VoiceRequest};
use pretty_assertions::assert_eq;

const SAMPLE_RATE: u32 = 8_000;

fn request(pitch: u8, duration_ms: f64) -> VoiceRequest {
    VoiceRequest {
        pitch,
        duration_ms,
        gain: Gain01::new(0.8),
    }
}

fn render_blocks(renderer: &mut dyn pianola_ports::synth::SynthRenderer, blocks: usize) -> f32 {
    let mut l = vec![0.0; 256];
    let mut r = vec![0.0; 256];
    let mut peak = 0.0_f32;
    for _ in 0..blocks {
        renderer.render(&mut l, &mut r);
        peak = l.iter().chain(r.iter()).fold(peak, |p, s| p.max(s.abs()));
    }
    peak
}

#[test]
fn started_voice_produces_sound_and_fades_after_duration() {
    let synth = SimpleSynth::new(4);
    let mut instance = synth.instantiate(SAMPLE_RATE).expect("instantiate");

    instance.voices.start(request(69, 50.0)).expect("start");
    let peak = render_blocks(instance.renderer.as_mut(), 2);
    assert!(peak > 0.01, "expected audible output, peak {peak}");

    // 50ms hold + 200ms release at 8kHz is 2000 samples
    render_blocks(instance.renderer.as_mut(), 12);
    let peak = render_blocks(instance.renderer.as_mut(), 1);
    assert_eq!(peak, 0.0);
}

#[test]
fn start_fails_when_polyphony_is_exhausted() {
    let synth = SimpleSynth::new(2);
    let instance = synth.instantiate(SAMPLE_RATE).expect("instantiate");

    instance.voices.start(request(60, 1000.0)).expect("first");
    instance.voices.start(request(64, 1000.0)).expect("second");
    let err = instance.voices.start(request(67, 1000.0)).unwrap_err();
    assert_eq!(err, VoiceError::Exhausted(2));
}

#[test]
fn stopped_voices_free_their_slot_after_release() {
    let synth = SimpleSynth::new(1);
    let mut instance = synth.instantiate(SAMPLE_RATE).expect("instantiate");

    let handle = instance.voices.start(request(60, 10_000.0)).expect("start");
    render_blocks(instance.renderer.as_mut(), 1);
    instance.voices.stop(handle);
    render_blocks(instance.renderer.as_mut(), 10);

    instance
        .voices
        .start(request(62, 100.0))
        .expect("slot should be free again");
}

#[test]
fn stop_on_unknown_or_finished_handle_is_a_no_op() {
    let synth = SimpleSynth::new(4);
    let mut instance = synth.instantiate(SAMPLE_RATE).expect("instantiate");

    instance.voices.stop(VoiceHandle(999));
    let handle = instance.voices.start(request(60, 10.0)).expect("start");
    render_blocks(instance.renderer.as_mut(), 20);
    instance.voices.stop(handle);
    let peak = render_blocks(instance.renderer.as_mut(), 1);
    assert_eq!(peak, 0.0);
}

#[test]
fn start_fails_before_the_queue_has_no_room_for_stops() {
    let synth = SimpleSynth::new(16).with_queue_capacity(4);
    let instance = synth.instantiate(SAMPLE_RATE).expect("instantiate");

    instance.voices.start(request(60, 100.0)).expect("first");
    instance.voices.start(request(62, 100.0)).expect("second");
    let err = instance.voices.start(request(64, 100.0)).unwrap_err();
    assert_eq!(err, VoiceError::QueueFull);
}

#[test]
fn stops_still_reach_the_renderer_after_starts_fill_the_queue() {
    let synth = SimpleSynth::new(64).with_queue_capacity(8);
    let mut instance = synth.instantiate(SAMPLE_RATE).expect("instantiate");

    let mut handles = Vec::new();
    let mut pitch = 60;
    while let Ok(handle) = instance.voices.start(request(pitch, 10_000.0)) {
        handles.push(handle);
        pitch += 1;
    }
    assert!(!handles.is_empty());

    for handle in &handles {
        instance.voices.stop(*handle);
    }

    // 200ms release at 8kHz fits in 7 blocks; the 10s holds would still be sounding
    render_blocks(instance.renderer.as_mut(), 10);
    let peak = render_blocks(instance.renderer.as_mut(), 1);
    assert_eq!(peak, 0.0);
}

#[test]
fn rejects_zero_sample_rate() {
    assert!(SimpleSynth::default().instantiate(0).is_err());
}
