//! Hardware device backend using cpal.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use tracing::{debug, error, info};

use mixer_ipc::{AudioDevice, AudioDeviceType, DeviceSelector};

use crate::device::{AudioStream, DeviceLayer, InputCallback, OutputCallback, StreamFormat};
use crate::error::AudioError;
use crate::AudioResult;

/// Opens streams on the platform's default cpal host.
pub struct CpalDeviceLayer {
    host: cpal::Host,
}

impl CpalDeviceLayer {
    pub fn new() -> Self {
        let host = cpal::default_host();
        info!(host = ?host.id(), "Using audio host");
        Self { host }
    }

    fn find_device(
        &self,
        selector: &DeviceSelector,
        device_type: AudioDeviceType,
    ) -> AudioResult<cpal::Device> {
        match selector {
            DeviceSelector::Default => {
                let device = match device_type {
                    AudioDeviceType::Input => self.host.default_input_device(),
                    AudioDeviceType::Output => self.host.default_output_device(),
                };
                device.ok_or_else(|| AudioError::DeviceNotFound(format!("default {}", direction(device_type))))
            }
            DeviceSelector::Named(name) => {
                let mut devices = match device_type {
                    AudioDeviceType::Input => self.host.input_devices()?,
                    AudioDeviceType::Output => self.host.output_devices()?,
                };
                devices
                    .find(|d| d.name().ok().as_deref() == Some(name.as_str()))
                    .ok_or_else(|| AudioError::DeviceNotFound(name.clone()))
            }
        }
    }
}

impl Default for CpalDeviceLayer {
    fn default() -> Self {
        Self::new()
    }
}

fn direction(device_type: AudioDeviceType) -> &'static str {
    match device_type {
        AudioDeviceType::Input => "input",
        AudioDeviceType::Output => "output",
    }
}

fn stream_config(format: StreamFormat) -> StreamConfig {
    StreamConfig {
        channels: format.channels,
        sample_rate: SampleRate(format.sample_rate),
        buffer_size: BufferSize::Fixed(format.frames_per_buffer),
    }
}

impl DeviceLayer for CpalDeviceLayer {
    fn open_input(
        &mut self,
        device: &DeviceSelector,
        format: StreamFormat,
        mut callback: InputCallback,
    ) -> AudioResult<Box<dyn AudioStream>> {
        let device = self.find_device(device, AudioDeviceType::Input)?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        debug!(device = %name, "Building input stream");

        let stream = device
            .build_input_stream(
                &stream_config(format),
                move |data: &[f32], _info: &cpal::InputCallbackInfo| callback(data),
                move |err| error!("Input stream error: {}", err),
                None,
            )
            .map_err(|e| match e {
                cpal::BuildStreamError::StreamConfigNotSupported => AudioError::FormatNotSupported(format!(
                    "{} Hz, {} channels, {} frames on {}",
                    format.sample_rate, format.channels, format.frames_per_buffer, name
                )),
                other => AudioError::from(other),
            })?;

        Ok(Box::new(CpalStream { stream }))
    }

    fn open_output(
        &mut self,
        device: &DeviceSelector,
        format: StreamFormat,
        mut callback: OutputCallback,
    ) -> AudioResult<Box<dyn AudioStream>> {
        let device = self.find_device(device, AudioDeviceType::Output)?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        debug!(device = %name, "Building output stream");

        let stream = device
            .build_output_stream(
                &stream_config(format),
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| callback(data),
                move |err| error!("Output stream error: {}", err),
                None,
            )
            .map_err(|e| match e {
                cpal::BuildStreamError::StreamConfigNotSupported => AudioError::FormatNotSupported(format!(
                    "{} Hz, {} channels, {} frames on {}",
                    format.sample_rate, format.channels, format.frames_per_buffer, name
                )),
                other => AudioError::from(other),
            })?;

        Ok(Box::new(CpalStream { stream }))
    }
}

struct CpalStream {
    stream: cpal::Stream,
}

impl AudioStream for CpalStream {
    fn start(&mut self) -> AudioResult<()> {
        self.stream.play()?;
        Ok(())
    }

    fn stop(&mut self) -> AudioResult<()> {
        self.stream.pause()?;
        Ok(())
    }

    fn close(self: Box<Self>) -> AudioResult<()> {
        // Dropping the stream releases the device and the callback.
        drop(self);
        Ok(())
    }
}

/// Enumerate capture and playback devices on the default host.
pub fn enumerate_audio_devices() -> AudioResult<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let default_input = host.default_input_device().and_then(|d| d.name().ok());
    let default_output = host.default_output_device().and_then(|d| d.name().ok());

    for device in host.input_devices()? {
        if let Ok(name) = device.name() {
            devices.push(AudioDevice {
                id: name.clone(),
                is_default: default_input.as_ref() == Some(&name),
                name,
                device_type: AudioDeviceType::Input,
            });
        }
    }

    for device in host.output_devices()? {
        if let Ok(name) = device.name() {
            devices.push(AudioDevice {
                id: name.clone(),
                is_default: default_output.as_ref() == Some(&name),
                name,
                device_type: AudioDeviceType::Output,
            });
        }
    }

    debug!(count = devices.len(), "Enumerated audio devices");
    Ok(devices)
}
