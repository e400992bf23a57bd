use crate::audio_params::AudioParams;
use pianola_ports::audio::AudioRenderCallback;
use pianola_ports::synth::SynthRenderer;
use pianola_ports::types::SampleTime;
use std::sync::Arc;

const LIMIT: f32 = 0.98;

/// Output stage between the synth and the device: master gain plus a peak limiter.
pub struct AudioGraph {
    renderer: Box<dyn SynthRenderer>,
    params: Arc<AudioParams>,
    limiter_gain: f32,
}

impl AudioGraph {
    pub fn new(renderer: Box<dyn SynthRenderer>, params: Arc<AudioParams>) -> Self {
        Self {
            renderer,
            params,
            limiter_gain: 1.0,
        }
    }

    pub fn limiter_gain(&self) -> f32 {
        self.limiter_gain
    }

    fn apply_limiter(&mut self, out_l: &mut [f32], out_r: &mut [f32]) {
        let peak = out_l
            .iter()
            .chain(out_r.iter())
            .fold(0.0_f32, |peak, sample| peak.max(sample.abs()));

        let target_gain = if peak > LIMIT { LIMIT / peak } else { 1.0 };
        // fast attack, slow release
        let coeff = if target_gain < self.limiter_gain {
            0.25
        } else {
            0.01
        };
        self.limiter_gain =
            (self.limiter_gain + coeff * (target_gain - self.limiter_gain)).clamp(0.0, 1.0);

        if self.limiter_gain < 0.999 {
            let gain = self.limiter_gain;
            for sample in out_l.iter_mut().chain(out_r.iter_mut()) {
                *sample *= gain;
            }
        }
    }
}

impl AudioRenderCallback for AudioGraph {
    fn render(&mut self, _sample_time_start: SampleTime, out_l: &mut [f32], out_r: &mut [f32]) {
        let frames = out_l.len().min(out_r.len());
        let (out_l, out_r) = (&mut out_l[..frames], &mut out_r[..frames]);

        self.renderer.render(out_l, out_r);

        let master = self.params.master();
        for sample in out_l.iter_mut().chain(out_r.iter_mut()) {
            *sample *= master;
        }

        self.apply_limiter(out_l, out_r);
    }
}
