//! Text-to-speech contract and voice preferences.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Substrings that mark a preferred voice, matched case-insensitively.
pub const PREFERRED_VOICE_HINTS: [&str; 4] = ["female", "woman", "samantha", "zira"];

pub const DEFAULT_RATE: f32 = 0.9;
pub const DEFAULT_PITCH: f32 = 1.2;
pub const DEFAULT_VOLUME: f32 = 1.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("Speech synthesizer unavailable: {0}")]
    Unavailable(String),
    #[error("Speech playback failed: {0}")]
    Playback(String),
}

/// Something to be spoken, with prosody in the usual 0..2 web-speech ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            rate: DEFAULT_RATE,
            pitch: DEFAULT_PITCH,
            volume: DEFAULT_VOLUME,
        }
    }

    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice;
        self
    }
}

/// Picks the first voice whose name matches a preferred hint.
pub fn preferred_voice(voices: &[String]) -> Option<&String> {
    voices.iter().find(|name| {
        let lower = name.to_lowercase();
        PREFERRED_VOICE_HINTS.iter().any(|hint| lower.contains(hint))
    })
}

/// Platform speech engine.
///
/// `speak` starts playback and returns; completion is observed via
/// `is_speaking`.
pub trait SpeechSynthesizer: Send + Sync {
    fn voices(&self) -> Vec<String>;
    fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError>;
    fn is_speaking(&self) -> bool;
    fn cancel(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_voice_matches_hints() {
        let voices = vec![
            "en-us".to_string(),
            "Microsoft Zira Desktop".to_string(),
            "Samantha".to_string(),
        ];
        assert_eq!(
            preferred_voice(&voices).map(String::as_str),
            Some("Microsoft Zira Desktop")
        );
        assert!(preferred_voice(&["en-gb".to_string()]).is_none());
    }

    #[test]
    fn test_utterance_defaults() {
        let utterance = Utterance::new("hello");
        assert_eq!(utterance.rate, 0.9);
        assert_eq!(utterance.pitch, 1.2);
        assert_eq!(utterance.volume, 1.0);
        assert!(utterance.voice.is_none());
    }
}
