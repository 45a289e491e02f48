//! Chat assistant panel.
//!
//! Keeps an in-memory transcript and forwards each message to the generative
//! text collaborator. Sends are single-flight: while one call is outstanding
//! further sends are rejected, not queued.

use equilibria_core::ApiError;
use equilibria_core::chat::{TextGenerator, Transcript, TranscriptEntry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Reply appended when the generative call fails.
pub const CHAT_ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";
/// Reply appended when the call succeeds without any text.
pub const EMPTY_REPLY: &str = "No reply.";

/// Why a send was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejection {
    EmptyInput,
    InFlight,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Ignored(SendRejection),
    /// An assistant reply was appended.
    Replied,
    /// The call failed and the fixed error reply was appended.
    Failed,
    /// The panel was closed before the reply arrived.
    Discarded,
}

struct PanelInner {
    id: Uuid,
    generator: Arc<dyn TextGenerator>,
    transcript: Mutex<Transcript>,
    in_flight: AtomicBool,
    open: AtomicBool,
}

/// Releases the single-flight flag when dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One open chat panel. Cloning shares the same panel.
#[derive(Clone)]
pub struct ChatPanel {
    inner: Arc<PanelInner>,
}

impl ChatPanel {
    pub fn open(generator: Arc<dyn TextGenerator>) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(panel_id = %id, "chat panel opened");
        Self {
            inner: Arc::new(PanelInner {
                id,
                generator,
                transcript: Mutex::new(Transcript::new()),
                in_flight: AtomicBool::new(false),
                open: AtomicBool::new(true),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Sends `text` to the assistant and records both sides of the exchange.
    pub async fn send(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored(SendRejection::EmptyInput);
        }
        if !self.is_open() {
            return SendOutcome::Ignored(SendRejection::Closed);
        }
        let Some(_guard) = InFlightGuard::acquire(&self.inner.in_flight) else {
            tracing::debug!(panel_id = %self.inner.id, "send rejected: request in flight");
            return SendOutcome::Ignored(SendRejection::InFlight);
        };

        if !self.append_if_open(TranscriptEntry::user(text)) {
            return SendOutcome::Ignored(SendRejection::Closed);
        }

        let result = self.inner.generator.generate(text).await;

        let (entry, outcome) = match result {
            Ok(reply) => (TranscriptEntry::assistant(reply), SendOutcome::Replied),
            Err(ApiError::EmptyResponse) => {
                (TranscriptEntry::assistant(EMPTY_REPLY), SendOutcome::Replied)
            }
            Err(err) => {
                tracing::warn!(panel_id = %self.inner.id, error = %err, "chat request failed");
                (TranscriptEntry::assistant(CHAT_ERROR_REPLY), SendOutcome::Failed)
            }
        };

        if self.append_if_open(entry) {
            outcome
        } else {
            tracing::debug!(panel_id = %self.inner.id, "discarding reply for closed panel");
            SendOutcome::Discarded
        }
    }

    pub fn transcript(&self) -> Transcript {
        self.lock_transcript().clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    pub fn is_in_flight(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Closes the panel and discards its transcript. Replies still in
    /// flight are dropped when they arrive.
    pub fn close(&self) {
        let mut transcript = self.lock_transcript();
        self.inner.open.store(false, Ordering::Release);
        *transcript = Transcript::new();
        tracing::debug!(panel_id = %self.inner.id, "chat panel closed");
    }

    fn append_if_open(&self, entry: TranscriptEntry) -> bool {
        let mut transcript = self.lock_transcript();
        if !self.is_open() {
            return false;
        }
        transcript.push(entry);
        true
    }

    fn lock_transcript(&self) -> MutexGuard<'_, Transcript> {
        self.inner
            .transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
