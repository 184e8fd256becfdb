//! Session orchestration
//!
//! The turn-taking loop: identify the user, greet them, then alternate
//! listening and replying until a stop event. Exactly one session runs at a
//! time; the stop flag is observed at turn boundaries, never mid-turn.
//! Outbound events fan out to every connected client over a broadcast
//! channel.

pub mod events;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt as _;
use tokio::sync::{broadcast, Notify};

pub use events::{ClientEvent, ServerEvent};

use crate::face::IdentifyFace;
use crate::llm::GenerateReply;
use crate::persona::Persona;
use crate::voice::{CapturePhrase, PhraseOutcome, RenderSpeech};

/// Broadcast capacity for outbound events
const EVENT_CAPACITY: usize = 64;

/// Shared control state for the single active session
///
/// Safe to set, clear, and wait on from tasks other than the session loop.
#[derive(Debug, Default)]
pub struct SessionControl {
    active: AtomicBool,
    ack: Notify,
}

impl SessionControl {
    /// Create idle control state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the single session slot; false when one is already active
    pub fn try_begin(&self) -> bool {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Request the session end; returns whether one was active
    pub fn stop(&self) -> bool {
        self.active.swap(false, Ordering::SeqCst)
    }

    /// Whether a session is active (checked at turn boundaries)
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Mark the session finished
    pub fn finish(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Drop any playback ack left over from an earlier speak
    pub fn clear_ack(&self) {
        let _ = self.ack.notified().now_or_never();
    }

    /// Record that the client finished playing audio
    pub fn ack_playback(&self) {
        self.ack.notify_one();
    }

    /// Wait for the playback ack, bounded by `timeout`
    pub async fn wait_ack(&self, timeout: Duration) {
        if tokio::time::timeout(timeout, self.ack.notified())
            .await
            .is_err()
        {
            tracing::debug!("playback ack timed out");
        }
    }
}

/// Timing knobs for the session loop
#[derive(Debug, Clone, Copy)]
pub struct SessionTuning {
    /// Face identification window
    pub identify_timeout: Duration,
    /// Extra speech-recognition attempts per listen
    pub listen_retries: u32,
    /// Buffer added to the estimated playback duration
    pub speak_gap: Duration,
    /// Bound on the wait for the client playback ack
    pub ack_timeout: Duration,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            identify_timeout: Duration::from_secs(10),
            listen_retries: 1,
            speak_gap: Duration::from_millis(500),
            ack_timeout: Duration::from_secs(10),
        }
    }
}

/// Drives the turn-taking loop and emits session events
pub struct Orchestrator {
    identity: Arc<dyn IdentifyFace>,
    speech: Arc<dyn CapturePhrase>,
    replies: Arc<dyn GenerateReply>,
    renderer: Arc<dyn RenderSpeech>,
    persona: Persona,
    tuning: SessionTuning,
    control: Arc<SessionControl>,
    events: broadcast::Sender<ServerEvent>,
}

impl Orchestrator {
    /// Assemble an orchestrator over its engine seams
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentifyFace>,
        speech: Arc<dyn CapturePhrase>,
        replies: Arc<dyn GenerateReply>,
        renderer: Arc<dyn RenderSpeech>,
        persona: Persona,
        tuning: SessionTuning,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            identity,
            speech,
            replies,
            renderer,
            persona,
            tuning,
            control: Arc::new(SessionControl::new()),
            events,
        }
    }

    /// Shared control state (stop flag + playback ack)
    #[must_use]
    pub fn control(&self) -> Arc<SessionControl> {
        Arc::clone(&self.control)
    }

    /// Subscribe to outbound session events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ServerEvent) {
        // Send fails only with no subscribers; nothing to do about that
        let _ = self.events.send(event);
    }

    /// Begin a session; false when one is already running
    pub fn start(self: &Arc<Self>) -> bool {
        if !self.control.try_begin() {
            tracing::warn!("start requested while a session is active");
            self.emit(ServerEvent::status("A session is already active."));
            return false;
        }

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.run_session().await;
        });
        true
    }

    /// End the session and say goodbye
    ///
    /// The loop observes the cleared flag at its next turn boundary.
    pub async fn stop(&self) {
        if self.control.stop() {
            tracing::info!("stop requested");
            self.speak(&self.persona.farewell).await;
            self.emit(ServerEvent::status("Stopped."));
        }
    }

    /// Run one full session to completion
    pub async fn run_session(&self) {
        self.emit(ServerEvent::status("Recognizing face..."));

        let Some(name) = self.identity.identify(self.tuning.identify_timeout).await else {
            tracing::info!("no face recognized");
            self.speak(&self.persona.unrecognized).await;
            self.control.finish();
            return;
        };

        tracing::info!(user = %name, "session started");
        self.speak(&self.persona.greeting_for(&name)).await;

        while self.control.is_active() {
            let Some(text) = self.listen(self.tuning.listen_retries).await else {
                self.speak(&self.persona.unheard).await;
                continue;
            };

            self.emit(ServerEvent::status(format!("You said: {text}")));
            let reply = self.replies.reply(&text).await;
            self.speak(&reply).await;
        }

        self.control.finish();
        tracing::info!("session idle");
    }

    /// Capture one utterance, retrying unintelligible speech
    ///
    /// Calibrates the ambient baseline once, then attempts capture up to
    /// `1 + max_retries` times. Silence before the onset timeout returns
    /// `None` without retrying.
    pub async fn listen(&self, max_retries: u32) -> Option<String> {
        self.speech.calibrate().await;
        self.emit(ServerEvent::status("Listening..."));

        for attempt in 0..=max_retries {
            match self.speech.capture().await {
                PhraseOutcome::Text(text) => return Some(text),
                PhraseOutcome::Silence => return None,
                PhraseOutcome::Unintelligible => {
                    tracing::debug!(attempt, "speech not recognized");
                    if attempt < max_retries {
                        self.speak(&self.persona.retry_prompt).await;
                    }
                }
            }
        }

        None
    }

    /// Render and emit one spoken line, pacing to the client
    ///
    /// Emits the speak event bracketed by mouth-move events, sleeps for the
    /// estimated playback duration plus a buffer, then waits (bounded) for
    /// the client's `speak-done` ack. A rendering failure degrades to a
    /// status event so the text still reaches the client.
    pub async fn speak(&self, text: &str) {
        let payload = match self.renderer.render(text).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "speech rendering failed");
                self.emit(ServerEvent::status(text));
                return;
            }
        };

        self.control.clear_ack();
        self.emit(ServerEvent::MouthMoveStart);

        let duration = payload.duration;
        self.emit(ServerEvent::Speak {
            text: payload.text,
            audio: payload.audio,
            animation_tag: payload.animation,
            expression_tag: payload.expression,
            viseme_timeline: payload.visemes,
        });

        tokio::time::sleep(duration + self.tuning.speak_gap).await;
        self.emit(ServerEvent::MouthMoveStop);

        self.control.wait_ack(self.tuning.ack_timeout).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_begin_claims_the_single_slot() {
        let control = SessionControl::new();
        assert!(control.try_begin());
        assert!(!control.try_begin());
        assert!(control.is_active());
    }

    #[test]
    fn stop_reports_whether_a_session_was_active() {
        let control = SessionControl::new();
        assert!(!control.stop());
        assert!(control.try_begin());
        assert!(control.stop());
        assert!(!control.is_active());
    }

    #[tokio::test]
    async fn ack_before_wait_completes_immediately() {
        let control = SessionControl::new();
        control.ack_playback();
        // A stored permit satisfies the wait without delay
        control.wait_ack(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn clear_ack_drops_a_stale_permit() {
        let control = SessionControl::new();
        control.ack_playback();
        control.clear_ack();

        let started = std::time::Instant::now();
        control.wait_ack(Duration::from_millis(50)).await;
        assert!(started.elapsed() >= Duration::from_millis(45));
    }

    #[tokio::test]
    async fn wait_ack_is_bounded() {
        let control = SessionControl::new();
        let started = std::time::Instant::now();
        control.wait_ack(Duration::from_millis(30)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
