//! Gapless playback queue
//!
//! Decoded audio segments are scheduled on a single output timeline measured
//! in samples: each new segment starts at `max(cursor, clock)` and the cursor
//! advances by the segment's length, so playback is strictly sequential with
//! no gaps or overlap regardless of decode latency jitter. Interruption
//! force-stops every tracked segment, clears the set, and resets the
//! timeline.
//!
//! The scheduling core is pure; the cpal output stream lives on a dedicated
//! thread (cpal streams aren't Send) and its callback is [`QueueState::fill`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// One decoded audio segment scheduled on the output timeline
#[derive(Debug)]
pub struct AudioSegment {
    /// Scheduled start offset in samples
    pub start: u64,
    /// Mono PCM samples
    pub samples: Vec<f32>,
}

/// Pure scheduling state shared with the output callback
#[derive(Debug, Default)]
pub struct QueueState {
    segments: VecDeque<AudioSegment>,
    /// Next available start time in samples
    cursor: u64,
    /// Samples played so far on the output timeline
    clock: u64,
}

impl QueueState {
    /// Schedule a segment for gapless sequential playback.
    ///
    /// Returns the scheduled start offset in samples.
    pub fn enqueue(&mut self, samples: Vec<f32>) -> u64 {
        let start = self.cursor.max(self.clock);
        self.cursor = start + samples.len() as u64;
        self.segments.push_back(AudioSegment { start, samples });
        start
    }

    /// Force-stop everything: drop all tracked segments, reset the timeline.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.cursor = 0;
        self.clock = 0;
    }

    /// Number of segments still tracked (scheduled or playing)
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.segments.len()
    }

    /// True when nothing is queued or playing
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.segments.is_empty()
    }

    /// Fill an interleaved output buffer, advancing the timeline.
    ///
    /// Used as the body of the cpal output callback. Fully played segments
    /// self-remove from the tracked set.
    pub fn fill(&mut self, out: &mut [f32], channels: usize) {
        for frame in out.chunks_mut(channels) {
            let sample = self.next_sample();
            for slot in frame.iter_mut() {
                *slot = sample;
            }
        }
    }

    fn next_sample(&mut self) -> f32 {
        let t = self.clock;
        self.clock += 1;

        loop {
            let Some(front) = self.segments.front() else {
                return 0.0;
            };
            if t < front.start {
                return 0.0;
            }
            let index = (t - front.start) as usize;
            if index < front.samples.len() {
                return front.samples[index];
            }
            // Segment fully played
            self.segments.pop_front();
        }
    }
}

/// Playback queue plus the optional output device behind it
pub struct PlaybackQueue {
    state: Arc<Mutex<QueueState>>,
    sample_rate: u32,
    stop: Arc<AtomicBool>,
    device_thread: Option<std::thread::JoinHandle<()>>,
}

impl PlaybackQueue {
    /// Create a queue with no output device attached (scheduling only)
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            sample_rate,
            stop: Arc::new(AtomicBool::new(false)),
            device_thread: None,
        }
    }

    /// Open the output device and start draining the queue
    ///
    /// # Errors
    ///
    /// Returns error if no suitable output device/config is available
    pub fn open_output(&mut self) -> Result<()> {
        if self.device_thread.is_some() {
            return Ok(());
        }

        let state = Arc::clone(&self.state);
        let stop = Arc::clone(&self.stop);
        let sample_rate = self.sample_rate;
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();

        let handle = std::thread::spawn(move || {
            let stream = match build_output_stream(sample_rate, state) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            while !stop.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(50));
            }
            drop(stream);
            tracing::debug!("playback output closed");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.device_thread = Some(handle);
                tracing::debug!(sample_rate, "playback output opened");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => Err(Error::Audio("playback thread died during open".to_string())),
        }
    }

    /// Schedule a decoded segment; returns its start offset in samples
    pub fn enqueue(&self, samples: Vec<f32>) -> u64 {
        self.state
            .lock()
            .map(|mut s| s.enqueue(samples))
            .unwrap_or(0)
    }

    /// Hard-stop: discard all queued/playing segments, reset the timeline
    pub fn stop_all(&self) {
        if let Ok(mut s) = self.state.lock() {
            s.clear();
        }
    }

    /// Segments still tracked (scheduled or playing)
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.state.lock().map(|s| s.tracked()).unwrap_or(0)
    }

    /// Stop the output device and clear the queue; idempotent
    pub fn close(&mut self) {
        self.stop_all();
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.device_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PlaybackQueue {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build a mono output stream at the requested rate, falling back to stereo
fn build_output_stream(
    sample_rate: u32,
    state: Arc<Mutex<QueueState>>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
        .or_else(|| {
            // Fallback: try stereo
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    let config: StreamConfig = supported.with_sample_rate(SampleRate(sample_rate)).config();
    let channels = config.channels as usize;

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate,
        channels,
        "audio playback initialized"
    );

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if let Ok(mut queue) = state.lock() {
                    queue.fill(data, channels);
                } else {
                    data.fill(0.0);
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;
    Ok(stream)
}

/// Play a standalone buffer through a short-lived output stream, blocking
/// until it finishes.
///
/// Used for alarm announcements outside any live session; the stream is
/// independent of every [`PlaybackQueue`].
///
/// # Errors
///
/// Returns error if the output device cannot be opened
pub fn play_once_blocking(samples: Vec<f32>, sample_rate: u32) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let duration_ms = (samples.len() as u64 * 1000) / u64::from(sample_rate);
    let state = Arc::new(Mutex::new(QueueState::default()));
    if let Ok(mut s) = state.lock() {
        s.enqueue(samples);
    }

    let stream = build_output_stream(sample_rate, Arc::clone(&state))?;

    // Poll for completion with a timeout margin
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(duration_ms + 500);
    loop {
        let idle = state.lock().map(|s| s.is_idle()).unwrap_or(true);
        if idle || start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
    tracing::debug!(duration_ms, "one-shot playback complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_schedule_back_to_back() {
        let mut q = QueueState::default();
        let a = q.enqueue(vec![0.1; 240]);
        let b = q.enqueue(vec![0.2; 480]);
        let c = q.enqueue(vec![0.3; 120]);

        assert_eq!(a, 0);
        assert_eq!(b, 240);
        assert_eq!(c, 720);
    }

    #[test]
    fn late_enqueue_schedules_at_current_clock() {
        let mut q = QueueState::default();
        q.enqueue(vec![0.1; 100]);

        // Play past the end of the first segment
        let mut out = vec![0.0f32; 300];
        q.fill(&mut out, 1);

        let start = q.enqueue(vec![0.2; 50]);
        assert_eq!(start, 300);
    }

    #[test]
    fn fill_plays_segments_in_order_and_removes_them() {
        let mut q = QueueState::default();
        q.enqueue(vec![0.5; 4]);
        q.enqueue(vec![-0.5; 4]);
        assert_eq!(q.tracked(), 2);

        let mut out = vec![0.0f32; 8];
        q.fill(&mut out, 1);
        assert_eq!(&out[..4], &[0.5; 4]);
        assert_eq!(&out[4..], &[-0.5; 4]);

        // One more sample drains the second segment from the tracked set
        let mut tail = vec![0.0f32; 1];
        q.fill(&mut tail, 1);
        assert_eq!(q.tracked(), 0);
        assert_eq!(tail[0], 0.0);
    }

    #[test]
    fn fill_duplicates_mono_across_stereo_channels() {
        let mut q = QueueState::default();
        q.enqueue(vec![0.25; 2]);

        let mut out = vec![0.0f32; 4];
        q.fill(&mut out, 2);
        assert_eq!(out, vec![0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn clear_discards_everything_and_resets_timeline() {
        let mut q = QueueState::default();
        q.enqueue(vec![0.1; 1000]);
        q.enqueue(vec![0.2; 1000]);
        let mut out = vec![0.0f32; 64];
        q.fill(&mut out, 1);

        q.clear();
        assert_eq!(q.tracked(), 0);
        assert!(q.is_idle());
        // Timeline restarts from zero
        assert_eq!(q.enqueue(vec![0.3; 10]), 0);
    }

    #[test]
    fn empty_queue_outputs_silence() {
        let mut q = QueueState::default();
        let mut out = vec![1.0f32; 16];
        q.fill(&mut out, 1);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
