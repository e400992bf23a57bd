use crate::voice::VoicePort;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum SynthError {
    #[error("instrument load failed: {0}")]
    InstrumentLoad(String),
    #[error("unsupported sample rate: {0}")]
    UnsupportedSampleRate(u32),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Audio-thread half of a synth instance.
pub trait SynthRenderer: Send + 'static {
    /// Overwrites `out_l`/`out_r` with the next `out_l.len()` frames.
    fn render(&mut self, out_l: &mut [f32], out_r: &mut [f32]);
}

/// One instantiated instrument: control half for the scheduler, render half for the audio thread.
pub struct SynthInstance {
    pub voices: Arc<dyn VoicePort>,
    pub renderer: Box<dyn SynthRenderer>,
}

/// Thread model:
/// - instantiate is called once per session from the core thread
/// - the returned voices are driven from the core thread, the renderer from the audio thread
pub trait SynthPort: Send + Sync {
    fn instantiate(&self, sample_rate_hz: u32) -> Result<SynthInstance, SynthError>;
}
