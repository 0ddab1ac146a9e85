use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleRate, StreamConfig};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Microphone capture at 16 kHz mono f32, the rate remote Whisper endpoints
/// expect.
pub struct AudioCapture {
    device_index: Option<usize>,
}

/// A live capture. Dropping or stopping the session ends the stream.
pub struct RecordingSession {
    stream: cpal::Stream,
    samples: Arc<Mutex<Vec<f32>>>,
}

impl AudioCapture {
    pub fn new(device_index: Option<usize>) -> Result<Self> {
        let device = Self::input_device(device_index)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        info!("Using audio input device: {}", device_name);

        Ok(Self { device_index })
    }

    pub fn sample_rate(&self) -> u32 {
        CAPTURE_SAMPLE_RATE
    }

    pub fn start_recording(&self) -> Result<RecordingSession> {
        let device = Self::input_device(self.device_index)?;

        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(CAPTURE_SAMPLE_RATE),
            buffer_size: BufferSize::Default,
        };

        debug!("Starting audio capture at {}Hz mono", CAPTURE_SAMPLE_RATE);

        let samples = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&samples);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buffer) = sink.lock() {
                        buffer.extend_from_slice(data);
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .context("Failed to build input stream")?;

        stream.play().context("Failed to start audio stream")?;

        Ok(RecordingSession { stream, samples })
    }

    fn input_device(index: Option<usize>) -> Result<Device> {
        let host = cpal::default_host();
        match index {
            Some(idx) => host
                .input_devices()
                .context("Failed to enumerate input devices")?
                .nth(idx)
                .with_context(|| format!("Audio input device index {idx} not found")),
            None => host
                .default_input_device()
                .context("No input device available"),
        }
    }
}

impl RecordingSession {
    /// Stops the stream and hands back the captured samples.
    pub fn stop(self) -> Result<Vec<f32>> {
        drop(self.stream);

        let samples = Arc::try_unwrap(self.samples)
            .map_err(|_| anyhow::anyhow!("Capture buffer still shared"))?
            .into_inner()
            .map_err(|_| anyhow::anyhow!("Capture buffer lock poisoned"))?;

        let duration_secs = samples.len() as f32 / CAPTURE_SAMPLE_RATE as f32;
        info!(
            "Recording stopped: {} samples ({:.2}s)",
            samples.len(),
            duration_secs
        );

        if samples.is_empty() {
            warn!("No audio data captured");
        }

        Ok(samples)
    }
}
