use thiserror::Error;

/// Unified error type for the materials-search crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The request never produced a response (connection refused, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),
    /// The endpoint answered with a non-2xx status.
    #[error("{message}")]
    Status { status: u16, message: String },
    /// The response body was not a valid listing payload.
    #[error("invalid response: {0}")]
    Decode(String),
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
    /// The search runtime has already been torn down.
    #[error("search runtime stopped")]
    Stopped,
}

impl EngineError {
    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            message: format!("HTTP error! status: {status}"),
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            EngineError::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            EngineError::status(status.as_u16())
        } else {
            EngineError::Transport(error.to_string())
        }
    }
}

/// Result type alias using [`EngineError`].
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_displays_like_http_failure() {
        let error = EngineError::status(503);
        assert_eq!(error.to_string(), "HTTP error! status: 503");
    }

    #[test]
    fn stopped_error_message() {
        assert_eq!(EngineError::Stopped.to_string(), "search runtime stopped");
    }
}
