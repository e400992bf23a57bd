use pianola_ports::storage::SettingsDto;
use pianola_ports::types::Gain01;
use std::sync::atomic::{AtomicU32, Ordering};

/// Mix parameters shared with the audio thread.
#[derive(Debug)]
pub struct AudioParams {
    master: AtomicU32,
}

impl AudioParams {
    pub fn new(settings: &SettingsDto) -> Self {
        Self {
            master: AtomicU32::new(settings.master_gain.get().to_bits()),
        }
    }

    pub fn set_master(&self, gain: Gain01) {
        self.master.store(gain.get().to_bits(), Ordering::Relaxed);
    }

    pub fn master(&self) -> f32 {
        f32::from_bits(self.master.load(Ordering::Relaxed))
    }
}
