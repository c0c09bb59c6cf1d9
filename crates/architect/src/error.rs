use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchitectError {
    #[error("no API key provided: use --api-key or set ANTHROPIC_API_KEY")]
    MissingApiKey,

    #[error("invalid input: {0}")]
    Input(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("API stream error: {0}")]
    Stream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArchitectError>;
