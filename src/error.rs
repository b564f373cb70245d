use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single completion request.
///
/// Every variant collapses into the same user-visible notice; the details
/// only ever reach the log file.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("no API key configured (set OPENAI_API_KEY or api_key in config.toml)")]
    MissingCredential,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned {0}")]
    Status(StatusCode),

    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

/// Rejections raised by the conversation store.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConversationError {
    #[error("user messages must contain non-whitespace text")]
    EmptyUserMessage,
}
