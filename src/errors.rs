use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to decode spreadsheet document: {0}")]
    SourceDecoding(#[from] csv::Error),

    #[error("Row with key '{key}' could not be persisted: {message}")]
    Persistence { key: String, message: String },

    #[error("Download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;
