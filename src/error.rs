//! Error type shared by every discovery operation.
//!
//! Each variant corresponds to one way an operation can end short of success.
//! The HTTP layer turns them into status codes and banner text.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoutError {
    /// Credentials or settings are missing. Blocks the action entirely.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Nothing selected, no queries generated, bad paging parameters.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// Network failure, timeout or an undecodable body.
    #[error("request failed: {0}")]
    Transport(String),

    /// The remote answered but reported a failure.
    #[error("{service} returned an error: {message}")]
    Api { service: String, message: String },

    /// User-initiated abort. Not a failure.
    #[error("operation cancelled")]
    Cancelled,

    #[error("result is already being processed: {url}")]
    Busy { url: String },

    #[error("no search result with url: {url}")]
    UnknownResult { url: String },

    #[error("unknown job: {0}")]
    UnknownJob(String),
}

impl ScoutError {
    pub fn api(service: &str, message: impl Into<String>) -> Self {
        ScoutError::Api {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScoutError::Cancelled)
    }
}

impl From<reqwest::Error> for ScoutError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScoutError::Transport(format!("timed out: {}", e))
        } else {
            ScoutError::Transport(e.to_string())
        }
    }
}

impl From<async_openai::error::OpenAIError> for ScoutError {
    fn from(e: async_openai::error::OpenAIError) -> Self {
        ScoutError::api("openai", e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
