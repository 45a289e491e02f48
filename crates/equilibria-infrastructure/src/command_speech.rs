//! Speech synthesizer that shells out to an espeak-compatible program.

use equilibria_core::chat::{SpeechError, SpeechSynthesizer, Utterance};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};

const BASE_WORDS_PER_MINUTE: f32 = 175.0;
const BASE_PITCH: f32 = 50.0;
const BASE_AMPLITUDE: f32 = 100.0;

/// Runs one speech process at a time; `cancel` kills it.
pub struct CommandSpeechSynthesizer {
    program: String,
    child: Mutex<Option<Child>>,
}

impl CommandSpeechSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            child: Mutex::new(None),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl SpeechSynthesizer for CommandSpeechSynthesizer {
    fn voices(&self) -> Vec<String> {
        match Command::new(&self.program).arg("--voices").output() {
            Ok(output) if output.status.success() => {
                parse_voices(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                tracing::debug!(status = %output.status, "voice listing failed");
                Vec::new()
            }
            Err(err) => {
                tracing::debug!(program = %self.program, error = %err, "voice listing unavailable");
                Vec::new()
            }
        }
    }

    fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        let mut slot = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut previous) = slot.take() {
            let _ = previous.kill();
            let _ = previous.wait();
        }

        let child = Command::new(&self.program)
            .args(speech_args(utterance))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => {
                    SpeechError::Unavailable(format!("{} not found", self.program))
                }
                _ => SpeechError::Playback(err.to_string()),
            })?;
        tracing::debug!(voice = ?utterance.voice, chars = utterance.text.len(), "speaking");
        *slot = Some(child);
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        let mut slot = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        let running = match slot.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        };
        if !running {
            *slot = None;
        }
        running
    }

    fn cancel(&self) {
        let mut slot = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut child) = slot.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CommandSpeechSynthesizer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Maps web-speech prosody (1.0 = normal) onto espeak's scales.
fn speech_args(utterance: &Utterance) -> Vec<String> {
    let mut args = vec![
        "-s".to_string(),
        scaled(BASE_WORDS_PER_MINUTE, utterance.rate, 80.0, 450.0),
        "-p".to_string(),
        scaled(BASE_PITCH, utterance.pitch, 0.0, 99.0),
        "-a".to_string(),
        scaled(BASE_AMPLITUDE, utterance.volume, 0.0, 200.0),
    ];
    if let Some(voice) = &utterance.voice {
        args.push("-v".to_string());
        args.push(voice.clone());
    }
    args.push("--".to_string());
    args.push(utterance.text.clone());
    args
}

fn scaled(base: f32, factor: f32, min: f32, max: f32) -> String {
    ((base * factor).round().clamp(min, max) as i32).to_string()
}

/// Parses the table printed by `espeak --voices` into names `-v` accepts.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File
///  5  en-gb           M  english            gmw/en
/// ```
///
/// Yields the `Language` column, which `-v` resolves in espeak and espeak-ng.
fn parse_voices(listing: &str) -> Vec<String> {
    let mut voices: Vec<String> = Vec::new();
    for language in listing
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
    {
        if !voices.iter().any(|known| known == language) {
            voices.push(language.to_string());
        }
    }
    voices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prosody_maps_to_espeak_scales() {
        let mut utterance = Utterance::new("hello").with_voice(Some("en-us".to_string()));
        utterance.rate = 2.0;
        utterance.pitch = 0.5;
        let args = speech_args(&utterance);
        assert_eq!(
            args,
            vec!["-s", "350", "-p", "25", "-a", "100", "-v", "en-us", "--", "hello"]
        );

        utterance.rate = 10.0;
        assert_eq!(speech_args(&utterance)[1], "450");
    }

    #[test]
    fn test_parse_voice_listing() {
        let listing = "Pty Language       Age/Gender VoiceName          File                 Other Languages\n \
                       5  af              --/M      Afrikaans          gmw/af\n \
                       5  en-us           --/F      English_(America)  gmw/en-US            (en 3)\n \
                       5  en-us           --/M      English_(Alt)      gmw/en-US-alt\n";
        assert_eq!(parse_voices(listing), vec!["af", "en-us"]);
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let synthesizer = CommandSpeechSynthesizer::new("equilibria-no-such-speech-program");
        let err = synthesizer.speak(&Utterance::new("hi")).unwrap_err();
        assert!(matches!(err, SpeechError::Unavailable(_)));
        assert!(!synthesizer.is_speaking());
        assert!(synthesizer.voices().is_empty());
    }
}
