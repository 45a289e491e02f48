//! Fake collaborators shared by the unit tests of this crate.

use equilibria_core::ApiError;
use equilibria_core::AuthError;
use equilibria_core::chat::{SpeechError, SpeechSynthesizer, TextGenerator, Utterance};
use equilibria_core::session::{
    AuthNotification, FederatedProvider, IdentityProvider, NotificationReceiver, Principal,
    RouteRenderer, Session, View,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, watch};

use crate::session::SessionSnapshot;

pub fn principal(id: &str) -> Principal {
    Principal::new(id).with_display_name(format!("User {id}"))
}

pub struct FakeIdentityProvider {
    sender: watch::Sender<Option<AuthNotification>>,
    accepted: Mutex<Option<(String, String, Principal)>>,
    sign_out_error: Mutex<Option<AuthError>>,
    federated: Mutex<Option<Result<Principal, AuthError>>>,
    credential_calls: Mutex<usize>,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(None);
        Self {
            sender,
            accepted: Mutex::new(None),
            sign_out_error: Mutex::new(None),
            federated: Mutex::new(None),
            credential_calls: Mutex::new(0),
        }
    }

    pub fn emit(&self, notification: AuthNotification) {
        self.sender.send_replace(Some(notification));
    }

    pub fn accept_credential(&self, email: &str, secret: &str, principal: Principal) {
        *self.accepted.lock().unwrap() = Some((email.to_string(), secret.to_string(), principal));
    }

    pub fn fail_sign_out(&self, err: AuthError) {
        *self.sign_out_error.lock().unwrap() = Some(err);
    }

    pub fn federated_result(&self, result: Result<Principal, AuthError>) {
        *self.federated.lock().unwrap() = Some(result);
    }

    pub fn credential_calls(&self) -> usize {
        *self.credential_calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_in_with_credential(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<Session, AuthError> {
        *self.credential_calls.lock().unwrap() += 1;
        match self.accepted.lock().unwrap().as_ref() {
            Some((e, s, principal)) if e == email && s == secret => {
                Ok(Session::signed_in(principal))
            }
            _ => Err(AuthError::InvalidCredential),
        }
    }

    async fn register_with_credential(
        &self,
        email: &str,
        _secret: &str,
        display_name: Option<&str>,
    ) -> Result<Session, AuthError> {
        *self.credential_calls.lock().unwrap() += 1;
        let mut principal = Principal::new(format!("uid-{email}")).with_email(email);
        principal.display_name = display_name.map(str::to_string);
        Ok(Session::signed_in(&principal))
    }

    async fn sign_in_with_federated_provider(
        &self,
        _provider: FederatedProvider,
    ) -> Result<Session, AuthError> {
        match self.federated.lock().unwrap().clone() {
            Some(Ok(principal)) => Ok(Session::signed_in(&principal)),
            Some(Err(err)) => Err(err),
            None => Err(AuthError::ProviderCancelled),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        match self.sign_out_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn notifications(&self) -> NotificationReceiver {
        self.sender.subscribe()
    }
}

/// Collects every snapshot delivered to a store subscription.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<SessionSnapshot>>>,
}

impl Recorder {
    pub fn callback(&self) -> impl Fn(&SessionSnapshot) + Send + Sync + 'static {
        let seen = self.seen.clone();
        move |snapshot| seen.lock().unwrap().push(snapshot.clone())
    }

    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        self.seen.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct RecordingRenderer {
    views: Mutex<Vec<View>>,
}

impl RecordingRenderer {
    pub fn views(&self) -> Vec<View> {
        self.views.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<View> {
        self.views.lock().unwrap().last().cloned()
    }
}

impl RouteRenderer for RecordingRenderer {
    fn render(&self, view: &View) {
        self.views.lock().unwrap().push(view.clone());
    }
}

/// Generator that replays queued results and records prompts.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, ApiError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn with_replies(replies: Vec<Result<String, ApiError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ApiError::EmptyResponse))
    }
}

/// Generator that blocks until `release` is called.
pub struct GatedGenerator {
    gate: Notify,
    reply: String,
}

impl GatedGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            gate: Notify::new(),
            reply: reply.to_string(),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait::async_trait]
impl TextGenerator for GatedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, ApiError> {
        self.gate.notified().await;
        Ok(self.reply.clone())
    }
}

pub struct FakeSynthesizer {
    voices: Vec<String>,
    speaking: AtomicBool,
    spoken: Mutex<Vec<Utterance>>,
    fail: bool,
}

impl FakeSynthesizer {
    pub fn new(voices: &[&str]) -> Self {
        Self {
            voices: voices.iter().map(|v| v.to_string()).collect(),
            speaking: AtomicBool::new(false),
            spoken: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn finish(&self) {
        self.speaking.store(false, Ordering::SeqCst);
    }
}

impl SpeechSynthesizer for FakeSynthesizer {
    fn voices(&self) -> Vec<String> {
        self.voices.clone()
    }

    fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        if self.fail {
            return Err(SpeechError::Unavailable("no engine".into()));
        }
        self.spoken.lock().unwrap().push(utterance.clone());
        self.speaking.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.speaking.store(false, Ordering::SeqCst);
    }
}
