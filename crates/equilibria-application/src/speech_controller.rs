use equilibria_core::chat::{SpeechError, SpeechSynthesizer, Transcript, Utterance, preferred_voice};
use std::sync::Arc;

/// Result of toggling read-aloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechAction {
    Started { voice: Option<String> },
    Stopped,
    /// No assistant reply to read.
    NothingToSay,
}

/// "Listen to last response" button behaviour.
pub struct SpeechController {
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl SpeechController {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { synthesizer }
    }

    pub fn is_speaking(&self) -> bool {
        self.synthesizer.is_speaking()
    }

    /// Stops playback if something is being read, otherwise reads the last
    /// assistant reply in the preferred voice.
    pub fn toggle_last_reply(&self, transcript: &Transcript) -> Result<SpeechAction, SpeechError> {
        if self.synthesizer.is_speaking() {
            self.synthesizer.cancel();
            return Ok(SpeechAction::Stopped);
        }

        let Some(reply) = transcript.last_assistant() else {
            return Ok(SpeechAction::NothingToSay);
        };

        let voices = self.synthesizer.voices();
        let voice = preferred_voice(&voices).cloned();
        let utterance = Utterance::new(reply.text.clone()).with_voice(voice.clone());
        self.synthesizer.speak(&utterance)?;
        tracing::debug!(voice = voice.as_deref().unwrap_or("default"), "speaking last reply");

        Ok(SpeechAction::Started { voice })
    }
}
