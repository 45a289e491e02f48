//! Chat assistant domain: transcript, generative collaborator, speech.

mod generator;
mod message;
mod speech;

pub use generator::TextGenerator;
pub use message::{ChatRole, Transcript, TranscriptEntry};
pub use speech::{
    DEFAULT_PITCH, DEFAULT_RATE, DEFAULT_VOLUME, PREFERRED_VOICE_HINTS, SpeechError,
    SpeechSynthesizer, Utterance, preferred_voice,
};
