//! Shared test doubles for orchestrator and API tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use tokio::sync::broadcast;

use kiosk_gateway::face::IdentifyFace;
use kiosk_gateway::llm::GenerateReply;
use kiosk_gateway::session::{Orchestrator, ServerEvent, SessionTuning};
use kiosk_gateway::voice::{
    viseme, CapturePhrase, PhraseOutcome, RenderSpeech, SpeechPayload,
};
use kiosk_gateway::{Persona, Result};

/// Identifier that always resolves to the same label (or none)
pub struct FixedIdentity(pub Option<String>);

#[async_trait]
impl IdentifyFace for FixedIdentity {
    async fn identify(&self, _timeout: Duration) -> Option<String> {
        self.0.clone()
    }
}

/// Phrase source that replays scripted outcomes, then blocks forever
pub struct ScriptedSpeech {
    outcomes: Mutex<VecDeque<PhraseOutcome>>,
    pub calibrations: AtomicUsize,
    pub captures: AtomicUsize,
}

impl ScriptedSpeech {
    pub fn new(outcomes: Vec<PhraseOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calibrations: AtomicUsize::new(0),
            captures: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CapturePhrase for ScriptedSpeech {
    async fn calibrate(&self) {
        self.calibrations.fetch_add(1, Ordering::SeqCst);
    }

    async fn capture(&self) -> PhraseOutcome {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(outcome) => outcome,
            // Script exhausted: behave like a microphone nobody speaks into
            None => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Reply engine that records every utterance it is asked about
pub struct RecordingReply {
    pub calls: Mutex<Vec<String>>,
    reply: String,
}

impl RecordingReply {
    pub fn new(reply: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reply: reply.to_string(),
        }
    }
}

#[async_trait]
impl GenerateReply for RecordingReply {
    async fn reply(&self, user_text: &str) -> String {
        self.calls.lock().unwrap().push(user_text.to_string());
        self.reply.clone()
    }
}

/// Deterministic renderer: audio is the text itself, zero duration
pub struct EchoRenderer;

#[async_trait]
impl RenderSpeech for EchoRenderer {
    async fn render(&self, text: &str) -> Result<SpeechPayload> {
        Ok(SpeechPayload {
            text: text.to_string(),
            audio: base64::engine::general_purpose::STANDARD.encode(text),
            animation: "Idle".to_string(),
            expression: "smile".to_string(),
            visemes: viseme::fallback_timeline(),
            duration: Duration::ZERO,
        })
    }
}

/// Tuning that keeps tests fast
pub fn fast_tuning() -> SessionTuning {
    SessionTuning {
        identify_timeout: Duration::from_millis(200),
        listen_retries: 1,
        speak_gap: Duration::ZERO,
        ack_timeout: Duration::from_millis(20),
    }
}

/// Assemble an orchestrator over test doubles
pub fn make_orchestrator(
    identity: FixedIdentity,
    speech: Arc<ScriptedSpeech>,
    replies: Arc<RecordingReply>,
    tuning: SessionTuning,
) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(
        Arc::new(identity),
        speech,
        replies,
        Arc::new(EchoRenderer),
        Persona::default(),
        tuning,
    ))
}

/// Drain currently pending events, waiting up to `idle` between them
pub async fn drain_events(
    rx: &mut broadcast::Receiver<ServerEvent>,
    idle: Duration,
) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(Ok(event)) = tokio::time::timeout(idle, rx.recv()).await {
        events.push(event);
    }
    events
}

/// Texts of all speak events, in order
pub fn spoken_texts(events: &[ServerEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::Speak { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Messages of all status events, in order
pub fn status_messages(events: &[ServerEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::Status { message } => Some(message.clone()),
            _ => None,
        })
        .collect()
}
