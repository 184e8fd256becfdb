//! Viseme timeline generation
//!
//! Derives mouth cues from the rendered PCM: fixed RMS windows quantized to
//! rhubarb-style cue labels, with adjacent identical cues merged. When no
//! PCM is available a short static timeline keeps the avatar's mouth moving.

use serde::{Deserialize, Serialize};

use super::capture::rms;

/// Analysis window length in seconds
const WINDOW_SECS: f32 = 0.08;

/// One time-stamped mouth cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisemeCue {
    /// Cue start, seconds from audio start
    pub start: f32,
    /// Cue end, seconds from audio start
    pub end: f32,
    /// Mouth-shape label ("X" closed through "A" wide open)
    #[serde(rename = "phoneme_label")]
    pub phoneme: String,
}

impl VisemeCue {
    fn new(start: f32, end: f32, phoneme: &str) -> Self {
        Self {
            start,
            end,
            phoneme: phoneme.to_string(),
        }
    }
}

/// Build a viseme timeline from mono PCM samples
#[must_use]
pub fn timeline(samples: &[f32], sample_rate: u32) -> Vec<VisemeCue> {
    if samples.is_empty() {
        return fallback_timeline();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let window = ((sample_rate as f32 * WINDOW_SECS) as usize).max(1);

    let mut cues: Vec<VisemeCue> = Vec::new();
    for (i, chunk) in samples.chunks(window).enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let start = (i * window) as f32 / sample_rate as f32;
        #[allow(clippy::cast_precision_loss)]
        let end = ((i * window + chunk.len()) as f32) / sample_rate as f32;
        let label = cue_for(rms(chunk));

        match cues.last_mut() {
            Some(last) if last.phoneme == label => last.end = end,
            _ => cues.push(VisemeCue::new(start, end, label)),
        }
    }

    cues
}

/// Map window energy to a mouth-shape label
fn cue_for(energy: f32) -> &'static str {
    if energy < 0.015 {
        "X"
    } else if energy < 0.05 {
        "B"
    } else if energy < 0.12 {
        "C"
    } else {
        "A"
    }
}

/// Static timeline used when no audio is available
#[must_use]
pub fn fallback_timeline() -> Vec<VisemeCue> {
    vec![
        VisemeCue::new(0.0, 0.2, "A"),
        VisemeCue::new(0.2, 0.4, "E"),
        VisemeCue::new(0.4, 0.6, "O"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_collapses_to_one_closed_cue() {
        let cues = timeline(&[0.0; 16_000], 16_000);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].phoneme, "X");
        assert!((cues[0].start).abs() < f32::EPSILON);
        assert!((cues[0].end - 1.0).abs() < 1e-3);
    }

    #[test]
    fn loud_audio_opens_the_mouth() {
        let cues = timeline(&[0.5; 16_000], 16_000);
        assert!(cues.iter().all(|c| c.phoneme == "A"));
    }

    #[test]
    fn empty_audio_uses_the_fallback() {
        let cues = timeline(&[], 16_000);
        assert_eq!(cues, fallback_timeline());
        assert_eq!(cues.len(), 3);
    }

    #[test]
    fn cues_are_contiguous_and_ordered() {
        // Alternate loud and quiet half-seconds
        let mut samples = Vec::new();
        for i in 0..4 {
            let level = if i % 2 == 0 { 0.5 } else { 0.0 };
            samples.extend(std::iter::repeat_n(level, 8000));
        }

        let cues = timeline(&samples, 16_000);
        assert!(cues.len() >= 4);
        for pair in cues.windows(2) {
            assert!((pair[0].end - pair[1].start).abs() < 1e-4);
            assert!(pair[0].start < pair[0].end);
        }
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let json = serde_json::to_string(&VisemeCue::new(0.0, 0.2, "A")).unwrap();
        assert!(json.contains("\"start\":0.0"));
        assert!(json.contains("\"phoneme_label\":\"A\""));
    }
}
