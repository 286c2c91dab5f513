use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed error ({feed}): {reason}")]
    Feed { feed: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn feed(feed: &'static str, reason: impl Into<String>) -> Self {
        AppError::Feed { feed, reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
