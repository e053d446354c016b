//! Microphone capture over CPAL (Cross-Platform Audio Library).

use crate::audio::{AudioFrame, AudioInput, CaptureConfig};
use crate::error::{ClientError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Microphone `AudioInput` backed by the platform's default input device.
///
/// The CPAL stream is not `Send`, so it lives on a dedicated worker thread;
/// frames cross into async land over an mpsc channel.
pub struct MicrophoneInput {
    config: CaptureConfig,
    capturing: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneInput {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioInput for MicrophoneInput {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(ClientError::AlreadyActive);
        }

        let (frame_tx, frame_rx) = mpsc::channel(32);
        let (ready_tx, ready_rx) = oneshot::channel();

        self.capturing.store(true, Ordering::SeqCst);
        let capturing = Arc::clone(&self.capturing);
        let config = self.config.clone();

        let worker = std::thread::spawn(move || {
            run_capture(config, frame_tx, ready_tx, capturing);
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.worker = Some(worker);
                info!("Microphone capture started");
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                self.capturing.store(false, Ordering::SeqCst);
                let _ = worker.join();
                Err(ClientError::AudioCapture {
                    message: "capture thread exited before reporting readiness".to_string(),
                })
            }
        }
    }

    async fn stop(&mut self) {
        if !self.capturing.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(worker) = self.worker.take() {
            // join on a blocking thread so the async runtime is not stalled
            let _ = tokio::task::spawn_blocking(move || worker.join()).await;
        }
        info!("Microphone capture stopped");
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

fn run_capture(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<()>>,
    capturing: Arc<AtomicBool>,
) {
    let host = cpal::default_host();
    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(ClientError::AudioCapture {
                message: "no input device available".to_string(),
            }));
            return;
        }
    };

    let sample_rate = config.sample_rate;
    let buffer_size = config.buffer_size;
    let channels = config.channels.max(1);

    let stream_config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut pending: Vec<f32> = Vec::with_capacity(buffer_size * 2);
    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _| {
            if channels > 1 {
                // Downmix interleaved channels by averaging
                for chunk in data.chunks(channels as usize) {
                    let sum: f32 = chunk.iter().sum();
                    pending.push(sum / chunk.len() as f32);
                }
            } else {
                pending.extend_from_slice(data);
            }

            while pending.len() >= buffer_size {
                let samples: Vec<f32> = pending.drain(..buffer_size).collect();
                let frame = AudioFrame {
                    samples,
                    sample_rate,
                };
                // No backpressure: drop the frame if the consumer is behind
                if frame_tx.try_send(frame).is_err() {
                    warn!("Dropping audio frame: consumer not keeping up");
                }
            }
        },
        |err| {
            warn!("Audio stream error: {}", err);
        },
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(cpal::BuildStreamError::DeviceNotAvailable) => {
            let _ = ready_tx.send(Err(ClientError::PermissionDenied {
                message: "input device not available (access denied or removed)".to_string(),
            }));
            return;
        }
        Err(e) => {
            let _ = ready_tx.send(Err(ClientError::AudioCapture {
                message: format!("failed to open input stream: {}", e),
            }));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(ClientError::AudioCapture {
            message: format!("failed to start input stream: {}", e),
        }));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    while capturing.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    // Dropping the stream releases the device
    drop(stream);
}
