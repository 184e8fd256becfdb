//! Voice pipeline tests
//!
//! Exercises phrase detection, WAV encoding, tempo stretching, and viseme
//! generation without audio hardware.

use std::time::Duration;

use kiosk_gateway::voice::render::stretch_tempo;
use kiosk_gateway::voice::{
    samples_to_wav, viseme, PhraseDetector, PhraseLimits, SAMPLE_RATE,
};

mod common;

/// Generate sine wave audio samples
fn sine(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
fn silence(duration_secs: f32) -> Vec<f32> {
    vec![0.0; (SAMPLE_RATE as f32 * duration_secs) as usize]
}

fn limits() -> PhraseLimits {
    PhraseLimits {
        onset_timeout: Duration::from_secs(2),
        max_phrase: Duration::from_secs(5),
        trailing_silence: Duration::from_millis(300),
    }
}

#[test]
fn speech_then_silence_completes_a_phrase() {
    let mut detector = PhraseDetector::new(0.05, limits());

    let speech = sine(440.0, 1.0, 0.4);
    let mut completed = None;

    for chunk in speech.chunks(1600) {
        if let kiosk_gateway::voice::PhraseProgress::Complete(samples) = detector.push(chunk) {
            completed = Some(samples);
        }
    }
    assert!(completed.is_none(), "phrase ended during speech");

    for chunk in silence(0.5).chunks(1600) {
        if let kiosk_gateway::voice::PhraseProgress::Complete(samples) = detector.push(chunk) {
            completed = Some(samples);
            break;
        }
    }

    let samples = completed.expect("phrase never completed");
    // At least the spoken second survived
    assert!(samples.len() >= SAMPLE_RATE as usize);
}

#[test]
fn pure_silence_times_out() {
    let mut detector = PhraseDetector::new(0.05, limits());

    let mut timed_out = false;
    for chunk in silence(3.0).chunks(1600) {
        if matches!(
            detector.push(chunk),
            kiosk_gateway::voice::PhraseProgress::TimedOut
        ) {
            timed_out = true;
            break;
        }
    }
    assert!(timed_out);
}

#[test]
fn wav_round_trip_preserves_sample_count() {
    let samples = sine(220.0, 0.25, 0.5);
    let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    assert_eq!(wav.len(), 44 + samples.len() * 2);
}

#[test]
fn stretch_is_deterministic() {
    let input = sine(330.0, 0.5, 0.4);
    let once = stretch_tempo(&input, 1.2).unwrap();
    let twice = stretch_tempo(&input, 1.2).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn stretch_shortens_audio() {
    let input = sine(330.0, 1.0, 0.4);
    let output = stretch_tempo(&input, 1.2).unwrap();
    assert!(
        output.len() < input.len(),
        "stretched audio should be shorter"
    );
}

#[test]
fn viseme_timeline_is_deterministic() {
    let samples = sine(200.0, 0.5, 0.3);
    let once = viseme::timeline(&samples, SAMPLE_RATE);
    let twice = viseme::timeline(&samples, SAMPLE_RATE);
    assert_eq!(once, twice);
}

#[test]
fn loud_speech_yields_open_mouth_cues() {
    let samples = sine(200.0, 0.5, 0.5);
    let cues = viseme::timeline(&samples, SAMPLE_RATE);
    assert!(cues.iter().any(|c| c.phoneme == "A"));
    assert!(cues.iter().all(|c| c.start < c.end));
}
