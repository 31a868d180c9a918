//! Microphone capture pipeline
//!
//! One input stream per session. The device callback slices audio into
//! fixed-size chunks; a forward task encodes each chunk and sends it over the
//! live transport unless Mochi is currently speaking (self-feedback gate).
//! Chunks are never coalesced or dropped by this layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use tokio::sync::mpsc;

use crate::audio::codec;
use crate::session::transport::LiveTransport;
use crate::{Error, Result};

/// Slices an incoming sample stream into fixed-size chunks
#[derive(Debug)]
pub struct Chunker {
    chunk_size: usize,
    pending: Vec<f32>,
}

impl Chunker {
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            pending: Vec::with_capacity(chunk_size),
        }
    }

    /// Append samples, returning every completed chunk
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        let mut out = Vec::new();
        self.pending.extend_from_slice(samples);
        while self.pending.len() >= self.chunk_size {
            let rest = self.pending.split_off(self.chunk_size);
            out.push(std::mem::replace(&mut self.pending, rest));
        }
        out
    }

    /// Samples buffered toward the next chunk
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Microphone stream feeding fixed-size chunks into a channel
pub struct CaptureStream {
    chunk_rx: Option<mpsc::UnboundedReceiver<Vec<f32>>>,
    stop: Arc<AtomicBool>,
    device_thread: Option<std::thread::JoinHandle<()>>,
}

impl CaptureStream {
    /// Open the default input device and start capturing
    ///
    /// # Errors
    ///
    /// Returns error if no suitable input device/config is available
    pub fn open(sample_rate: u32, chunk_size: usize) -> Result<Self> {
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();

        let device_thread = std::thread::spawn(move || {
            let stream = match build_input_stream(sample_rate, chunk_size, chunk_tx) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            while !stop_flag.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(50));
            }
            drop(stream);
            tracing::debug!("audio capture stopped");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::debug!(sample_rate, chunk_size, "audio capture started");
                Ok(Self {
                    chunk_rx: Some(chunk_rx),
                    stop,
                    device_thread: Some(device_thread),
                })
            }
            Ok(Err(e)) => {
                let _ = device_thread.join();
                Err(e)
            }
            Err(_) => Err(Error::Audio("capture thread died during open".to_string())),
        }
    }

    /// Take the chunk receiver (once) for the forward task
    pub fn take_chunks(&mut self) -> Option<mpsc::UnboundedReceiver<Vec<f32>>> {
        self.chunk_rx.take()
    }

    /// Stop and release the microphone; idempotent
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.device_thread.take() {
            let _ = handle.join();
        }
    }

    /// Check if the device is still held
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.device_thread.is_some()
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build the mono input stream whose callback chunks and forwards samples
fn build_input_stream(
    sample_rate: u32,
    chunk_size: usize,
    chunk_tx: mpsc::UnboundedSender<Vec<f32>>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

    let supported = device
        .supported_input_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
        .ok_or_else(|| Error::Audio("no suitable input config found".to_string()))?;

    let config: StreamConfig = supported.with_sample_rate(SampleRate(sample_rate)).config();

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate,
        channels = config.channels,
        "audio capture initialized"
    );

    let chunker = Arc::new(Mutex::new(Chunker::new(chunk_size)));

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut chunker) = chunker.lock() {
                    for chunk in chunker.push(data) {
                        let _ = chunk_tx.send(chunk);
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio capture error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;
    Ok(stream)
}

/// Spawn the task forwarding captured chunks to the live transport.
///
/// Each chunk is encoded to PCM16 and sent as a realtime media frame unless
/// the shared speaking flag is set. The task ends when the capture stream
/// stops (channel closes) or the transport rejects a frame.
pub(crate) fn spawn_forward_task(
    mut chunks: mpsc::UnboundedReceiver<Vec<f32>>,
    speaking: Arc<AtomicBool>,
    transport: Arc<dyn LiveTransport>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(chunk) = chunks.recv().await {
            if speaking.load(Ordering::Relaxed) {
                continue;
            }
            let frame = codec::encode_frame(&chunk);
            if let Err(e) = transport.send_audio(&frame).await {
                tracing::debug!(error = %e, "stopping capture forward");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunker_emits_fixed_size_chunks() {
        let mut chunker = Chunker::new(4);

        assert!(chunker.push(&[0.1, 0.2]).is_empty());
        assert_eq!(chunker.pending(), 2);

        let chunks = chunker.push(&[0.3, 0.4, 0.5]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(chunker.pending(), 1);
    }

    #[test]
    fn chunker_emits_multiple_chunks_from_one_push() {
        let mut chunker = Chunker::new(2);
        let chunks = chunker.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], vec![1.0, 2.0]);
        assert_eq!(chunks[1], vec![3.0, 4.0]);
        assert_eq!(chunker.pending(), 1);
    }

    #[test]
    fn chunker_never_drops_samples() {
        let mut chunker = Chunker::new(3);
        let mut total = 0;
        for batch in [[0.0; 5].as_slice(), &[0.0; 1], &[0.0; 7]] {
            total += chunker.push(batch).iter().map(Vec::len).sum::<usize>();
        }
        assert_eq!(total + chunker.pending(), 13);
    }
}
