use std::time::Duration;

use folio_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("evaluation timed out after {0:?}")]
    Timeout(Duration),

    #[error("evaluator returned HTTP {status}")]
    Remote { status: u16, body: String },

    #[error("evaluator returned no feedback")]
    EmptyFeedback,

    #[error("evaluator is not configured: {0}")]
    NotConfigured(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Channel(#[from] folio_channels::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

folio_common::impl_context!();
