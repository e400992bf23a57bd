use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, FromSample, SampleFormat, SampleRate, SizedSample, StreamConfig,
    SupportedBufferSize, SupportedStreamConfigRange,
};
use pianola_ports::audio::{AudioError, AudioOutputPort, AudioRenderCallback, AudioStreamHandle};
use pianola_ports::types::{AudioConfig, AudioOutputDevice, DeviceId};
use std::sync::mpsc;
use std::thread;

const DEFAULT_BLOCK_FRAMES: u32 = 4096;
const MAX_BLOCK_FRAMES: u32 = 16_384;

pub struct CpalAudioOutputPort {
    host: cpal::Host,
}

struct SelectedStreamConfig {
    config: StreamConfig,
    sample_format: SampleFormat,
    /// Render scratch size; callbacks larger than this are rendered in several blocks.
    block_frames: usize,
}

impl CpalAudioOutputPort {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    fn list_devices_from_host(
        host: &cpal::Host,
    ) -> Result<Vec<(DeviceId, cpal::Device)>, AudioError> {
        let host_id = format!("{:?}", host.id());
        let devices = host
            .output_devices()
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        Ok(devices
            .enumerate()
            .map(|(index, device)| {
                let name = device_name(&device);
                let id = DeviceId(format!("cpal:{}:{}:{}", host_id, index, name));
                (id, device)
            })
            .collect())
    }

    fn select_stream_config(
        device: &cpal::Device,
        desired: AudioConfig,
    ) -> Result<SelectedStreamConfig, AudioError> {
        let supported = device
            .supported_output_configs()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        let chosen = select_supported_config(supported, desired)?;
        let sample_format = chosen.sample_format();
        let block_frames = match (desired.buffer_size_frames, chosen.buffer_size()) {
            (Some(frames), _) => frames,
            (None, SupportedBufferSize::Range { max, .. }) => *max,
            (None, SupportedBufferSize::Unknown) => DEFAULT_BLOCK_FRAMES,
        }
        .clamp(1, MAX_BLOCK_FRAMES) as usize;

        let mut config = chosen.config();
        config.buffer_size = match desired.buffer_size_frames {
            Some(frames) => BufferSize::Fixed(frames),
            None => BufferSize::Default,
        };

        Ok(SelectedStreamConfig {
            config,
            sample_format,
            block_frames,
        })
    }
}

impl Default for CpalAudioOutputPort {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the stream alive on its own thread; `close` drops it there.
pub struct CpalAudioStreamHandle {
    stop_tx: mpsc::Sender<()>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl AudioStreamHandle for CpalAudioStreamHandle {
    fn close(mut self: Box<Self>) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl AudioOutputPort for CpalAudioOutputPort {
    fn list_outputs(&self) -> Result<Vec<AudioOutputDevice>, AudioError> {
        let devices = Self::list_devices_from_host(&self.host)?;
        let mut results = Vec::new();

        for (id, device) in devices {
            let Ok(default_config) = device.default_output_config() else {
                continue;
            };
            results.push(AudioOutputDevice {
                id,
                name: device_name(&device),
                default_config: AudioConfig {
                    sample_rate_hz: default_config.sample_rate().0,
                    channels: default_config.channels(),
                    buffer_size_frames: None,
                },
            });
        }

        Ok(results)
    }

    fn default_output(&self) -> Result<DeviceId, AudioError> {
        let default = self
            .host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceNotFound("no default output".to_string()))?;
        let default_name = device_name(&default);

        Self::list_devices_from_host(&self.host)?
            .into_iter()
            .find(|(_, device)| device_name(device) == default_name)
            .map(|(id, _)| id)
            .ok_or(AudioError::DeviceNotFound(default_name))
    }

    fn open_output(
        &self,
        device_id: &DeviceId,
        config: AudioConfig,
        cb: Box<dyn AudioRenderCallback>,
    ) -> Result<Box<dyn AudioStreamHandle>, AudioError> {
        let device_id = device_id.clone();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let join_handle = thread::spawn(move || {
            let stream = match open_stream(&device_id, config, cb) {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            let _ = stop_rx.recv();
            drop(stream);
        });

        match ready_rx
            .recv()
            .map_err(|e| AudioError::Backend(e.to_string()))?
        {
            Ok(()) => Ok(Box::new(CpalAudioStreamHandle {
                stop_tx,
                join_handle: Some(join_handle),
            })),
            Err(err) => {
                let _ = join_handle.join();
                Err(err)
            }
        }
    }
}

fn open_stream(
    device_id: &DeviceId,
    desired: AudioConfig,
    cb: Box<dyn AudioRenderCallback>,
) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = CpalAudioOutputPort::list_devices_from_host(&host)?
        .into_iter()
        .find(|(id, _)| id == device_id)
        .map(|(_, device)| device)
        .ok_or_else(|| AudioError::DeviceNotFound(device_id.to_string()))?;

    let selected = CpalAudioOutputPort::select_stream_config(&device, desired)?;
    let stream = match selected.sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &selected, cb),
        SampleFormat::I16 => build_stream::<i16>(&device, &selected, cb),
        SampleFormat::U16 => build_stream::<u16>(&device, &selected, cb),
        other => Err(AudioError::UnsupportedConfig(format!(
            "sample format {:?}",
            other
        ))),
    }?;

    stream
        .play()
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
    Ok(stream)
}

/// Scratch buffers are allocated here, never inside the callback.
fn build_stream<T>(
    device: &cpal::Device,
    selected: &SelectedStreamConfig,
    mut cb: Box<dyn AudioRenderCallback>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = (selected.config.channels as usize).max(1);
    let mut left = vec![0.0_f32; selected.block_frames];
    let mut right = vec![0.0_f32; selected.block_frames];
    let mut sample_time: u64 = 0;

    device
        .build_output_stream(
            &selected.config,
            move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                for block in data.chunks_mut(left.len() * channels) {
                    let frames = block.len() / channels;
                    let (l, r) = (&mut left[..frames], &mut right[..frames]);
                    cb.render(sample_time, l, r);
                    write_interleaved(block, channels, l, r);
                    sample_time = sample_time.saturating_add(frames as u64);
                }
            },
            |err| log::error!("cpal stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::Backend(e.to_string()))
}

fn select_supported_config(
    supported: impl Iterator<Item = SupportedStreamConfigRange>,
    desired: AudioConfig,
) -> Result<cpal::SupportedStreamConfig, AudioError> {
    supported
        .filter(|range| range.channels() == desired.channels)
        .filter(|range| {
            (range.min_sample_rate().0..=range.max_sample_rate().0)
                .contains(&desired.sample_rate_hz)
        })
        .max_by_key(|range| match range.sample_format() {
            SampleFormat::F32 => 3,
            SampleFormat::I16 => 2,
            SampleFormat::U16 => 1,
            _ => 0,
        })
        .map(|range| range.with_sample_rate(SampleRate(desired.sample_rate_hz)))
        .ok_or_else(|| {
            AudioError::UnsupportedConfig(format!(
                "no {}-channel config at {} Hz",
                desired.channels, desired.sample_rate_hz
            ))
        })
}

fn write_interleaved<T>(data: &mut [T], channels: usize, left: &[f32], right: &[f32])
where
    T: SizedSample + FromSample<f32>,
{
    if channels == 0 {
        return;
    }
    for (frame, out) in data.chunks_mut(channels).enumerate() {
        let l = left.get(frame).copied().unwrap_or(0.0).clamp(-1.0, 1.0);
        let r = right.get(frame).copied().unwrap_or(0.0).clamp(-1.0, 1.0);
        if channels == 1 {
            out[0] = T::from_sample((l + r) * 0.5);
            continue;
        }
        out[0] = T::from_sample(l);
        out[1] = T::from_sample(r);
        for sample in out.iter_mut().skip(2) {
            *sample = T::EQUILIBRIUM;
        }
    }
}

fn device_name(device: &cpal::Device) -> String {
    device
        .name()
        .unwrap_or_else(|_| "Unknown Output".to_string())
}
