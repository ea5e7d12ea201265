//! Voice transcription over a platform speech-recognition engine.
//!
//! At most one session is open at a time. Partial transcripts stream to a
//! caller-supplied sink while the session runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{RecognitionErrorKind, VoiceError};

/// How long `start` waits for the engine to confirm.
const START_CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);

/// Events emitted by a recognition engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// The engine is listening.
    Started,
    /// Full transcript so far (interim or final).
    Transcript(String),
    Error(RecognitionErrorKind),
    Ended,
}

/// A platform speech-recognition capability.
pub trait SpeechRecognizer: Send + Sync {
    /// Begin listening; events are delivered on `events`.
    fn begin(&self, events: mpsc::UnboundedSender<RecognitionEvent>) -> Result<(), VoiceError>;

    /// Stop listening.
    fn halt(&self) -> Result<(), VoiceError>;
}

/// Clears the active flag unless the start completes.
struct PendingStart<'a> {
    active: &'a AtomicBool,
    armed: bool,
}

impl PendingStart<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingStart<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.active.store(false, Ordering::Release);
        }
    }
}

/// Manages the single voice session.
pub struct VoiceTranscriber {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    active: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl VoiceTranscriber {
    pub fn new(recognizer: Option<Arc<dyn SpeechRecognizer>>) -> Self {
        Self {
            recognizer,
            active: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A transcriber on a client without speech recognition.
    pub fn unsupported() -> Self {
        Self::new(None)
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Open a session. Resolves once the engine confirms it is listening;
    /// an engine error before that rejects the start.
    pub async fn start(&self, sink: mpsc::UnboundedSender<String>) -> Result<(), VoiceError> {
        let recognizer = self.recognizer.as_ref().ok_or(VoiceError::NotSupported)?;

        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(VoiceError::AlreadyActive);
        }
        let pending = PendingStart {
            active: &self.active,
            armed: true,
        };
        let session = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let (tx, mut rx) = mpsc::unbounded_channel();
        recognizer.begin(tx)?;

        let confirmation = tokio::time::timeout(START_CONFIRM_TIMEOUT, rx.recv()).await;
        match confirmation {
            Ok(Some(RecognitionEvent::Started)) => {}
            Ok(Some(RecognitionEvent::Transcript(text))) => {
                let _ = sink.send(text);
            }
            Ok(Some(RecognitionEvent::Error(kind))) => {
                warn!(%kind, "Speech recognition failed to start");
                return Err(VoiceError::Recognition { kind });
            }
            Ok(Some(RecognitionEvent::Ended)) | Ok(None) => {
                return Err(VoiceError::Engine("session ended before starting".into()));
            }
            Err(_) => {
                let _ = recognizer.halt();
                return Err(VoiceError::Engine("engine did not confirm start".into()));
            }
        }
        pending.disarm();

        info!(session, "Voice session started");

        let active = Arc::clone(&self.active);
        let generation = Arc::clone(&self.generation);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    RecognitionEvent::Transcript(text) => {
                        let _ = sink.send(text);
                    }
                    RecognitionEvent::Error(kind) => {
                        warn!(session, %kind, message = kind.user_message(), "Speech recognition error");
                    }
                    RecognitionEvent::Ended => break,
                    RecognitionEvent::Started => {}
                }
            }
            if generation.load(Ordering::Acquire) == session {
                active.store(false, Ordering::Release);
            }
            debug!(session, "Voice session pump finished");
        });

        Ok(())
    }

    /// Close the session. Idempotent; engine stop failures are swallowed.
    pub fn stop(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(recognizer) = &self.recognizer {
            if let Err(e) = recognizer.halt() {
                warn!(error = %e, "Speech recognizer failed to stop");
            }
        }
        info!("Voice session stopped");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Emits a scripted event sequence on `begin`.
    pub(crate) struct ScriptedRecognizer {
        pub script: Vec<RecognitionEvent>,
        pub halt_fails: bool,
        pub halts: AtomicUsize,
        pub sender: Mutex<Option<mpsc::UnboundedSender<RecognitionEvent>>>,
    }

    impl ScriptedRecognizer {
        pub(crate) fn new(script: Vec<RecognitionEvent>) -> Self {
            Self {
                script,
                halt_fails: false,
                halts: AtomicUsize::new(0),
                sender: Mutex::new(None),
            }
        }
    }

    impl SpeechRecognizer for ScriptedRecognizer {
        fn begin(&self, events: mpsc::UnboundedSender<RecognitionEvent>) -> Result<(), VoiceError> {
            for event in &self.script {
                let _ = events.send(event.clone());
            }
            *self.sender.lock().unwrap() = Some(events);
            Ok(())
        }

        fn halt(&self) -> Result<(), VoiceError> {
            self.halts.fetch_add(1, Ordering::SeqCst);
            if let Some(sender) = self.sender.lock().unwrap().take() {
                let _ = sender.send(RecognitionEvent::Ended);
            }
            if self.halt_fails {
                Err(VoiceError::Engine("already stopped".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn unsupported_rejects_immediately() {
        let transcriber = VoiceTranscriber::unsupported();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(transcriber.start(tx).await, Err(VoiceError::NotSupported)));
        assert!(!transcriber.is_active());
    }

    #[tokio::test]
    async fn partials_stream_to_sink() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![
            RecognitionEvent::Started,
            RecognitionEvent::Transcript("quero".into()),
            RecognitionEvent::Transcript("quero um burger".into()),
        ]));
        let transcriber = VoiceTranscriber::new(Some(recognizer.clone()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        transcriber.start(tx).await.unwrap();
        assert!(transcriber.is_active());
        assert_eq!(rx.recv().await.unwrap(), "quero");
        assert_eq!(rx.recv().await.unwrap(), "quero um burger");

        transcriber.stop();
        assert!(!transcriber.is_active());
        assert_eq!(recognizer.halts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![RecognitionEvent::Started]));
        let transcriber = VoiceTranscriber::new(Some(recognizer));
        let (tx, _rx) = mpsc::unbounded_channel();
        transcriber.start(tx.clone()).await.unwrap();
        assert!(matches!(transcriber.start(tx).await, Err(VoiceError::AlreadyActive)));
    }

    #[tokio::test]
    async fn error_before_start_rejects() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![RecognitionEvent::Error(
            RecognitionErrorKind::NotAllowed,
        )]));
        let transcriber = VoiceTranscriber::new(Some(recognizer));
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = transcriber.start(tx).await.unwrap_err();
        assert!(matches!(
            err,
            VoiceError::Recognition {
                kind: RecognitionErrorKind::NotAllowed
            }
        ));
        assert!(!transcriber.is_active());
    }

    #[tokio::test]
    async fn error_after_start_is_only_logged() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![
            RecognitionEvent::Started,
            RecognitionEvent::Error(RecognitionErrorKind::NoSpeech),
            RecognitionEvent::Transcript("oi".into()),
        ]));
        let transcriber = VoiceTranscriber::new(Some(recognizer));
        let (tx, mut rx) = mpsc::unbounded_channel();
        transcriber.start(tx).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "oi");
        assert!(transcriber.is_active());
    }

    #[tokio::test]
    async fn cancelled_start_frees_the_session() {
        // No events: the start waits for a confirmation that never comes.
        let recognizer = Arc::new(ScriptedRecognizer::new(Vec::new()));
        let transcriber = VoiceTranscriber::new(Some(recognizer));
        let (tx, _rx) = mpsc::unbounded_channel();

        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), transcriber.start(tx.clone())).await;
        assert!(cancelled.is_err());
        assert!(!transcriber.is_active());
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_swallows_failures() {
        let mut recognizer = ScriptedRecognizer::new(vec![RecognitionEvent::Started]);
        recognizer.halt_fails = true;
        let recognizer = Arc::new(recognizer);
        let transcriber = VoiceTranscriber::new(Some(recognizer.clone()));

        transcriber.stop();
        assert_eq!(recognizer.halts.load(Ordering::SeqCst), 0);

        let (tx, _rx) = mpsc::unbounded_channel();
        transcriber.start(tx).await.unwrap();
        transcriber.stop();
        transcriber.stop();
        assert_eq!(recognizer.halts.load(Ordering::SeqCst), 1);
        assert!(!transcriber.is_active());
    }
}
