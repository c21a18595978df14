use thiserror::Error;

pub type Result<T> = std::result::Result<T, CleanError>;

#[derive(Debug, Error)]
pub enum CleanError {
    /// Fatal: raised before any chunk is processed
    #[error("environment variable {var} is not set; the rewriting service needs an API key")]
    MissingCredential { var: String },

    /// Network failure or timeout talking to the rewriting service
    #[error("rewriting service request failed: {0}")]
    Transport(String),

    #[error("rewriting service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed rewriting service response: {0}")]
    MalformedResponse(String),

    #[error("invalid noise pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CleanError {
    /// Errors that only affect one chunk; the document keeps going
    pub fn is_per_chunk(&self) -> bool {
        matches!(
            self,
            CleanError::Transport(_) | CleanError::Api { .. } | CleanError::MalformedResponse(_)
        )
    }
}
