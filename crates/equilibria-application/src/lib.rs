//! Application services of the Equilibria client.
//!
//! - `session`: session store, notification listener, navigation shell
//! - `chat_panel`: single-flight chat transcript
//! - `speech_controller`: read-aloud of the last reply
//! - `journal_analyzer`: summary and mood rating of journal entries

pub mod chat_panel;
pub mod journal_analyzer;
pub mod session;
pub mod speech_controller;

#[cfg(test)]
mod test_support;

pub use chat_panel::{CHAT_ERROR_REPLY, ChatPanel, EMPTY_REPLY, SendOutcome, SendRejection};
pub use journal_analyzer::{AnalysisError, EntryAnalysis, JournalAnalyzer};
pub use session::{AppShell, MountedShell, SessionListener, SessionSnapshot, SessionStore};
pub use speech_controller::{SpeechAction, SpeechController};
