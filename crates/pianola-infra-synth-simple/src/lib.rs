use pianola_ports::synth::{SynthError, SynthInstance, SynthPort, SynthRenderer};
use pianola_ports::types::Pitch;
use pianola_ports::voice::{VoiceError, VoiceHandle, VoicePort, VoiceRequest};
use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

const AMPLITUDE: f32 = 0.2;
const ATTACK_SECONDS: f32 = 0.005;
const RELEASE_SECONDS: f32 = 0.2;

/// Sine-voice instrument. Every `instantiate` call creates an independent instrument.
pub struct SimpleSynth {
    max_voices: usize,
    queue_capacity: usize,
}

impl SimpleSynth {
    pub fn new(max_voices: usize) -> Self {
        Self {
            max_voices: max_voices.max(1),
            queue_capacity: 1024,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

impl Default for SimpleSynth {
    fn default() -> Self {
        Self::new(64)
    }
}

impl SynthPort for SimpleSynth {
    fn instantiate(&self, sample_rate_hz: u32) -> Result<SynthInstance, SynthError> {
        if sample_rate_hz == 0 {
            return Err(SynthError::UnsupportedSampleRate(sample_rate_hz));
        }
        let (producer, consumer) = RingBuffer::new(self.queue_capacity);
        let live = Arc::new(AtomicUsize::new(0));

        let voices = SimpleSynthVoices {
            producer: Mutex::new(producer),
            next_handle: AtomicU64::new(1),
            live: live.clone(),
            max_voices: self.max_voices,
            sample_rate_hz: sample_rate_hz as f32,
        };
        let renderer = SimpleSynthRenderer {
            consumer,
            voices: Vec::with_capacity(self.max_voices),
            live,
            sample_rate_hz: sample_rate_hz as f32,
        };

        Ok(SynthInstance {
            voices: Arc::new(voices),
            renderer: Box::new(renderer),
        })
    }
}

#[derive(Clone, Copy, Debug)]
enum VoiceCommand {
    Start {
        handle: VoiceHandle,
        pitch: Pitch,
        gain: f32,
        hold_samples: u32,
    },
    Stop {
        handle: VoiceHandle,
    },
}

/// Control half: hands out handles and queues commands for the audio thread.
pub struct SimpleSynthVoices {
    producer: Mutex<Producer<VoiceCommand>>,
    next_handle: AtomicU64,
    // voices started and not yet fully faded out
    live: Arc<AtomicUsize>,
    max_voices: usize,
    sample_rate_hz: f32,
}

impl VoicePort for SimpleSynthVoices {
    fn start(&self, request: VoiceRequest) -> Result<VoiceHandle, VoiceError> {
        let live = self.live.load(Ordering::Acquire);
        if live >= self.max_voices {
            return Err(VoiceError::Exhausted(live));
        }

        let handle = VoiceHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let hold_samples = (request.duration_ms.max(0.0) / 1000.0 * self.sample_rate_hz as f64)
            .round()
            .min(u32::MAX as f64) as u32;
        let command = VoiceCommand::Start {
            handle,
            pitch: request.pitch,
            gain: request.gain.get(),
            hold_samples,
        };

        let mut producer = self.producer.lock();
        // one free slot per live voice, this one included, stays reserved for its stop
        if producer.slots() <= live + 1 {
            return Err(VoiceError::QueueFull);
        }
        producer.push(command).map_err(|_| VoiceError::QueueFull)?;
        self.live.fetch_add(1, Ordering::AcqRel);
        Ok(handle)
    }

    fn stop(&self, handle: VoiceHandle) {
        if self
            .producer
            .lock()
            .push(VoiceCommand::Stop { handle })
            .is_err()
        {
            // the voice still ends after its own duration
            log::warn!("synth queue full, dropped stop for voice {}", handle.0);
        }
    }
}

#[derive(Clone, Debug)]
struct Voice {
    handle: VoiceHandle,
    phase: f32,
    phase_step: f32,
    gain: f32,
    attack_left: u32,
    attack_total: u32,
    hold_left: u32,
    release_left: u32,
    release_total: u32,
    releasing: bool,
}

impl Voice {
    fn new(handle: VoiceHandle, pitch: Pitch, gain: f32, hold_samples: u32, sample_rate: f32) -> Self {
        let freq = 440.0 * 2.0_f32.powf((pitch as f32 - 69.0) / 12.0);
        let attack_total = ((sample_rate * ATTACK_SECONDS) as u32).max(1);
        let release_total = ((sample_rate * RELEASE_SECONDS) as u32).max(1);
        Self {
            handle,
            phase: 0.0,
            phase_step: TAU * freq / sample_rate,
            gain: gain.clamp(0.05, 1.0),
            attack_left: attack_total,
            attack_total,
            hold_left: hold_samples,
            release_left: release_total,
            release_total,
            releasing: false,
        }
    }

    fn release(&mut self) {
        self.releasing = true;
    }

    fn is_finished(&self) -> bool {
        self.releasing && self.release_left == 0
    }

    fn envelope(&mut self) -> f32 {
        if self.releasing {
            self.release_left = self.release_left.saturating_sub(1);
            return self.release_left as f32 / self.release_total as f32;
        }
        let level = if self.attack_left > 0 {
            self.attack_left -= 1;
            1.0 - self.attack_left as f32 / self.attack_total as f32
        } else {
            1.0
        };
        if self.hold_left > 0 {
            self.hold_left -= 1;
        } else {
            self.releasing = true;
        }
        level
    }

    fn render_add(&mut self, out_l: &mut [f32], out_r: &mut [f32]) {
        for (l, r) in out_l.iter_mut().zip(out_r.iter_mut()) {
            if self.is_finished() {
                break;
            }
            let sample = self.phase.sin() * self.gain * self.envelope() * AMPLITUDE;
            *l += sample;
            *r += sample;
            self.phase += self.phase_step;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
        }
    }
}

/// Audio-thread half: applies queued commands at block boundaries and mixes all voices.
pub struct SimpleSynthRenderer {
    consumer: Consumer<VoiceCommand>,
    voices: Vec<Voice>,
    live: Arc<AtomicUsize>,
    sample_rate_hz: f32,
}

impl SimpleSynthRenderer {
    fn apply_commands(&mut self) {
        while let Ok(command) = self.consumer.pop() {
            match command {
                VoiceCommand::Start {
                    handle,
                    pitch,
                    gain,
                    hold_samples,
                } => self.voices.push(Voice::new(
                    handle,
                    pitch,
                    gain,
                    hold_samples,
                    self.sample_rate_hz,
                )),
                VoiceCommand::Stop { handle } => {
                    // unknown handles already finished on their own
                    if let Some(voice) = self.voices.iter_mut().find(|v| v.handle == handle) {
                        voice.release();
                    }
                }
            }
        }
    }
}

impl SynthRenderer for SimpleSynthRenderer {
    fn render(&mut self, out_l: &mut [f32], out_r: &mut [f32]) {
        self.apply_commands();

        out_l.fill(0.0);
        out_r.fill(0.0);
        for voice in &mut self.voices {
            voice.render_add(out_l, out_r);
        }

        let before = self.voices.len();
        self.voices.retain(|voice| !voice.is_finished());
        let finished = before - self.voices.len();
        if finished > 0 {
            self.live.fetch_sub(finished, Ordering::AcqRel);
        }
    }
}
