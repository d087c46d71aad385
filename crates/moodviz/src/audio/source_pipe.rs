//! Audio device capture feeding the magnitude source.
//!
//! Captures from a system device with cpal into a shared ring of mono
//! samples. Each frame the newest samples are auto-gained and pushed through
//! an [`FftMagnitudeSource`], so the pipe itself is a [`MagnitudeSource`].

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{error, info, warn};

use super::source::{FftMagnitudeSource, MagnitudeSource, DEFAULT_FFT_SIZE};

/// Device config queries can hang on broken devices
const DEVICE_TIMEOUT: Duration = Duration::from_secs(3);

type SampleRing = Arc<Mutex<VecDeque<f32>>>;

pub struct DeviceInfo {
    pub device: cpal::Device,
    pub name: String,
    pub is_input: bool,
}

pub struct SourcePipe {
    buffer: SampleRing,
    devices: Vec<DeviceInfo>,
    current_device: usize,
    _stream: Option<Stream>,
    magnitudes: FftMagnitudeSource,
    scratch: Vec<f32>,
    // Auto-gain normalization state
    smoothed_peak: f32,
    target_level: f32,
}

/// A poisoned lock only means a capture callback panicked; the samples are still usable
fn lock(buffer: &SampleRing) -> MutexGuard<'_, VecDeque<f32>> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SourcePipe {
    pub fn new() -> Self {
        let devices = Self::collect_devices();
        let buffer: SampleRing = Arc::new(Mutex::new(VecDeque::from(vec![0.0; DEFAULT_FFT_SIZE])));

        let start_index = devices
            .iter()
            // Prefer pipewire or pulse input devices (more reliable on Linux)
            .position(|d| d.is_input && d.name == "pipewire")
            .or_else(|| devices.iter().position(|d| d.is_input && d.name == "pulse"))
            .or_else(|| {
                // Fall back to default output device for loopback capture
                let host = cpal::default_host();
                let default_output_name = host.default_output_device().and_then(|d| d.name().ok());
                default_output_name
                    .and_then(|name| devices.iter().position(|d| !d.is_input && d.name == name))
            })
            .unwrap_or(0);

        let stream = match devices.get(start_index) {
            Some(info) => {
                let stream = Self::build_stream(info, Arc::clone(&buffer));
                if stream.is_some() {
                    info!(index = start_index, device = %info.name, input = info.is_input, "audio device selected");
                }
                stream
            }
            None => {
                error!("no audio devices found");
                None
            }
        };

        Self {
            buffer,
            devices,
            current_device: start_index,
            _stream: stream,
            magnitudes: FftMagnitudeSource::new(),
            scratch: Vec::with_capacity(DEFAULT_FFT_SIZE),
            smoothed_peak: 0.1,
            target_level: 0.5,
        }
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn current_device(&self) -> Option<&str> {
        self.devices.get(self.current_device).map(|d| d.name.as_str())
    }

    pub fn is_capturing(&self) -> bool {
        self._stream.is_some()
    }

    fn collect_devices() -> Vec<DeviceInfo> {
        let host = cpal::default_host();
        let mut devices = Vec::new();

        if let Ok(input_devices) = host.input_devices() {
            for device in input_devices {
                if let Ok(name) = device.name() {
                    devices.push(DeviceInfo {
                        device,
                        name,
                        is_input: true,
                    });
                }
            }
        }

        if let Ok(output_devices) = host.output_devices() {
            for device in output_devices {
                if let Ok(name) = device.name() {
                    devices.push(DeviceInfo {
                        device,
                        name,
                        is_input: false,
                    });
                }
            }
        }

        devices
    }

    /// Get device config with timeout (the config call often hangs on bad devices)
    fn get_config_with_timeout(device: &Device, is_input: bool) -> Option<StreamConfig> {
        let device_clone = device.clone();
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let config = if is_input {
                device_clone.default_input_config()
            } else {
                device_clone.default_output_config()
            };
            let _ = tx.send(config);
        });

        match rx.recv_timeout(DEVICE_TIMEOUT) {
            Ok(Ok(config)) => Some(config.into()),
            Ok(Err(err)) => {
                warn!(%err, "failed to get device config");
                None
            }
            Err(_) => {
                warn!(timeout = ?DEVICE_TIMEOUT, "device config timed out");
                None
            }
        }
    }

    fn build_stream(device_info: &DeviceInfo, ring: SampleRing) -> Option<Stream> {
        let stream_config =
            Self::get_config_with_timeout(&device_info.device, device_info.is_input)?;
        let channels = (stream_config.channels as usize).max(1);

        let err_fn = |err| error!(%err, "audio stream error");

        let stream = device_info.device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mut buffer = lock(&ring);
                for chunk in data.chunks(channels) {
                    let sample: f32 = chunk.iter().sum::<f32>() / channels as f32;
                    buffer.pop_front();
                    buffer.push_back(sample);
                }
            },
            err_fn,
            None,
        );

        match stream {
            Ok(s) => {
                if let Err(err) = s.play() {
                    warn!(%err, "failed to play stream");
                    return None;
                }
                Some(s)
            }
            Err(err) => {
                warn!(%err, "failed to build stream");
                None
            }
        }
    }

    /// Switch to the next device that opens, wrapping around.
    /// Returns the new device name.
    pub fn next_device(&mut self) -> Option<String> {
        let count = self.devices.len();
        let current = self.current_device;
        for offset in 1..count {
            let index = (current + offset) % count;
            if self.select_device(index) {
                return Some(self.devices[index].name.clone());
            }
        }
        None
    }

    /// Attempts to select a device. Returns true when it is now capturing.
    pub fn select_device(&mut self, index: usize) -> bool {
        let Some(info) = self.devices.get(index) else {
            return false;
        };
        if index == self.current_device && self._stream.is_some() {
            return true;
        }

        lock(&self.buffer).iter_mut().for_each(|x| *x = 0.0);

        match Self::build_stream(info, Arc::clone(&self.buffer)) {
            Some(stream) => {
                info!(index, device = %info.name, input = info.is_input, "audio device selected");
                self._stream = Some(stream);
                self.current_device = index;
                true
            }
            None => {
                warn!(index, device = %info.name, "audio device failed to open");
                false
            }
        }
    }

    /// Copy the newest samples and apply auto-gain normalization
    fn pull_samples(&mut self) {
        self.scratch.clear();
        self.scratch.extend(lock(&self.buffer).iter().copied());

        let current_peak = self.scratch.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        if current_peak > self.smoothed_peak {
            // Fast attack when signal gets louder
            self.smoothed_peak = self.smoothed_peak * 0.8 + current_peak * 0.2;
        } else {
            // Slow release when signal gets quieter
            self.smoothed_peak = self.smoothed_peak * 0.995 + current_peak * 0.005;
        }

        let safe_peak = self.smoothed_peak.max(0.001);
        let gain = (self.target_level / safe_peak).clamp(0.5, 10.0);
        self.scratch
            .iter_mut()
            .for_each(|s| *s = (*s * gain).clamp(-1.0, 1.0));
    }
}

impl Default for SourcePipe {
    fn default() -> Self {
        Self::new()
    }
}

impl MagnitudeSource for SourcePipe {
    fn bin_count(&self) -> usize {
        if self._stream.is_some() {
            self.magnitudes.bin_count()
        } else {
            0
        }
    }

    fn read_frame(&mut self) -> Option<&[u8]> {
        if self._stream.is_none() {
            return None;
        }
        self.pull_samples();
        self.magnitudes.push_samples(&self.scratch);
        self.magnitudes.read_frame()
    }
}
