//! Audio pipeline integration tests
//!
//! Exercises the codec, chunker, and playback scheduling without audio
//! hardware.

use mochi_core::audio::{Chunker, QueueState, codec};

mod common;

const CAPTURE_RATE: u32 = 16_000;

#[test]
fn codec_roundtrip_recovers_samples_within_pcm16_precision() {
    let original = common::sine_samples(CAPTURE_RATE, 440.0, 0.25, 0.9);

    let encoded = codec::encode_frame(&original);
    assert_eq!(encoded.len(), original.len() * 2);

    let recovered = codec::decode_frame(&encoded);
    assert_eq!(recovered.len(), original.len());
    for (a, b) in original.iter().zip(recovered.iter()) {
        assert!(
            (a - b).abs() <= 1.0 / 32768.0,
            "rounding error above one PCM16 step: {a} vs {b}"
        );
    }
}

#[test]
fn codec_base64_transport_wrap_is_lossless() {
    let samples = common::sine_samples(CAPTURE_RATE, 220.0, 0.05, 0.4);
    let frame = codec::encode_frame(&samples);

    let wire = codec::encode_base64(&frame);
    assert_eq!(codec::decode_base64(&wire), frame);
}

#[test]
fn playback_schedule_is_strictly_non_overlapping() {
    let mut queue = QueueState::default();

    let lengths = [2400usize, 480, 9600, 1, 1200];
    let mut previous_end = 0u64;

    for len in lengths {
        let start = queue.enqueue(vec![0.1; len]);
        assert!(
            start >= previous_end,
            "segment at {start} overlaps previous end {previous_end}"
        );
        // Gapless: with no playback progress, segments are back to back
        assert_eq!(start, previous_end);
        previous_end = start + len as u64;
    }
}

#[test]
fn playback_stays_gapless_under_decode_jitter() {
    let mut queue = QueueState::default();

    // First segment arrives, playback overtakes it before the next decode
    queue.enqueue(vec![0.1; 100]);
    let mut out = vec![0.0f32; 250];
    queue.fill(&mut out, 1);

    // Late segment starts at the output clock, not in the played-out past
    let late_start = queue.enqueue(vec![0.2; 100]);
    assert_eq!(late_start, 250);

    // A prompt follow-up is scheduled seamlessly after it
    let next_start = queue.enqueue(vec![0.3; 100]);
    assert_eq!(next_start, 350);
}

#[test]
fn interruption_empties_tracked_set_regardless_of_queue_depth() {
    let mut queue = QueueState::default();
    for _ in 0..37 {
        queue.enqueue(common::silence(CAPTURE_RATE, 0.01));
    }
    assert_eq!(queue.tracked(), 37);

    queue.clear();

    assert_eq!(queue.tracked(), 0);
    assert!(queue.is_idle());
    // Timeline reset: the next segment starts a fresh timeline
    assert_eq!(queue.enqueue(vec![0.0; 10]), 0);
}

#[test]
fn chunker_preserves_every_captured_sample_in_order() {
    let mut chunker = Chunker::new(160);
    let audio = common::sine_samples(CAPTURE_RATE, 330.0, 0.1, 0.5);

    let mut forwarded = Vec::new();
    for burst in audio.chunks(70) {
        for chunk in chunker.push(burst) {
            assert_eq!(chunk.len(), 160);
            forwarded.extend(chunk);
        }
    }

    assert_eq!(forwarded.len() + chunker.pending(), audio.len());
    assert_eq!(forwarded[..], audio[..forwarded.len()]);
}
