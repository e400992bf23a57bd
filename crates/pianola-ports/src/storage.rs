use crate::playback::PausePolicy;
use crate::types::*;
use serde::{Deserialize, Serialize};

fn default_sample_rate_hz() -> u32 {
    48_000
}

fn default_master_gain() -> Gain01 {
    Gain01::new(0.8)
}

fn default_max_voices() -> usize {
    64
}

fn default_stop_at_end() -> bool {
    true
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    pub selected_audio_out: Option<DeviceId>,
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: u32,
    pub audio_buffer_size_frames: Option<u32>,
    #[serde(default = "default_master_gain")]
    pub master_gain: Gain01,
    #[serde(default = "default_max_voices")]
    pub max_voices: usize,
    pub pause_policy: PausePolicy,
    #[serde(default = "default_stop_at_end")]
    pub stop_at_end: bool,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            selected_audio_out: None,
            sample_rate_hz: default_sample_rate_hz(),
            audio_buffer_size_frames: None,
            master_gain: default_master_gain(),
            max_voices: default_max_voices(),
            pause_policy: PausePolicy::Silence,
            stop_at_end: default_stop_at_end(),
        }
    }
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError>;
}
