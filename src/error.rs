use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

// Enum for handling application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("AI error: {0}")]
    AI(#[from] AIError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    // Fatal at startup: the story cannot run without a model.
    #[error(
        "Model credentials missing: set AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_KEY (or OPENAI_API_KEY)"
    )]
    MissingModelConfig,

    #[error("Home directory not found")]
    NoHomeDir,

    #[error("Failed to initialize logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}

// Errors from the language-model provider.
#[derive(Debug, Error)]
pub enum AIError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    #[error("The model returned an empty completion")]
    EmptyCompletion,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Provider error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No input device available")]
    NoInputDevice,

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Cpal default config error: {0}")]
    CpalDefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Cpal build stream error: {0}")]
    CpalBuildStream(#[from] cpal::BuildStreamError),

    #[error("Cpal play stream error: {0}")]
    CpalPlayStream(#[from] cpal::PlayStreamError),

    #[error("hound audio error: {0}")]
    Hound(#[from] hound::Error),

    #[error("Speech service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Speech service rejected the request: {0}")]
    Service(String),

    #[error("Thread join error: {0}")]
    ThreadJoin(String),

    #[error("std io AudioError: {0}")]
    IO(#[from] std::io::Error),
}

impl From<tokio::task::JoinError> for AudioError {
    fn from(err: tokio::task::JoinError) -> Self {
        AudioError::ThreadJoin(err.to_string())
    }
}

// Reasons a turn did not produce a new story beat.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("A turn is already being processed")]
    Busy,

    #[error("There is no choice number {0}")]
    NoSuchChoice(usize),

    #[error("Error communicating with the story model: {0}")]
    Provider(#[from] AIError),
}
