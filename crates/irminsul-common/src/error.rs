use thiserror::Error;

#[derive(Debug, Error)]
pub enum IrminsulError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IrminsulError>;
