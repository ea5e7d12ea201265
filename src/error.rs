//! Error types for Order Assist.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Address lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Text generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Voice error: {0}")]
    Voice(#[from] VoiceError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Postal-code directory errors.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Client is offline")]
    Offline,

    #[error("Another postal-code lookup is already running")]
    Busy,

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("Directory returned HTTP {status}")]
    Status { status: u16 },

    #[error("Postal code {cep} not found")]
    NotFound { cep: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Malformed directory response: {0}")]
    Decode(String),
}

/// Remote text-generation errors.
///
/// `Timeout` and `ClientError` abort the retry loop; everything else is
/// treated as transient.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Client error: HTTP {status}")]
    ClientError { status: u16 },

    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    #[error("Invalid response: {reason}")]
    InvalidResponse { reason: String },
}

impl GenerationError {
    /// Whether a retry could plausibly succeed.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, Self::Timeout(_) | Self::ClientError { .. })
    }
}

/// Failure categories reported by a speech-recognition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecognitionErrorKind {
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Network,
    Aborted,
    ServiceNotAllowed,
}

impl RecognitionErrorKind {
    /// Message shown to the customer for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoSpeech => "Nenhuma fala detectada. Tente falar mais perto do microfone.",
            Self::AudioCapture => "Não foi possível acessar o microfone.",
            Self::NotAllowed => "Permissão do microfone negada. Libere o acesso nas configurações.",
            Self::Network => "Erro de rede durante o reconhecimento de voz.",
            Self::Aborted => "Reconhecimento de voz cancelado.",
            Self::ServiceNotAllowed => "Serviço de reconhecimento de voz indisponível.",
        }
    }
}

impl std::fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoSpeech => "no-speech",
            Self::AudioCapture => "audio-capture",
            Self::NotAllowed => "not-allowed",
            Self::Network => "network",
            Self::Aborted => "aborted",
            Self::ServiceNotAllowed => "service-not-allowed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RecognitionErrorKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "no-speech" => Ok(Self::NoSpeech),
            "audio-capture" => Ok(Self::AudioCapture),
            "not-allowed" => Ok(Self::NotAllowed),
            "network" => Ok(Self::Network),
            "aborted" => Ok(Self::Aborted),
            "service-not-allowed" => Ok(Self::ServiceNotAllowed),
            _ => Err(format!("Unknown recognition error: {}", s)),
        }
    }
}

/// Voice transcription errors.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("Speech recognition is not supported on this client")]
    NotSupported,

    #[error("A voice session is already active")]
    AlreadyActive,

    #[error("Recognition failed ({kind}): {}", kind.user_message())]
    Recognition { kind: RecognitionErrorKind },

    #[error("Recognition engine failed: {0}")]
    Engine(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
