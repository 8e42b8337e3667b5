//! Error types and handling for the wagerline client

use thiserror::Error;

/// Result type alias for wagerline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories used to decide how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The request never completed (connect, timeout, malformed body)
    Transport,
    /// Credentials were discarded and the user must sign in again
    Session,
    /// Input rejected locally before anything was sent
    Validation,
    /// The authority refused the request
    BusinessRule,
    /// Local setup problems (config, credential file)
    Configuration,
}

/// Wagerline error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-success response; `message` is the authority's own text
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Action refused locally because the round or request is in the wrong state
    #[error("{0}")]
    Rejected(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error for callers that only care about the broad kind
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network(_) | Error::Serialization(_) => ErrorCategory::Transport,
            Error::SessionExpired => ErrorCategory::Session,
            Error::Validation(_) => ErrorCategory::Validation,
            Error::Api { .. } | Error::Rejected(_) => ErrorCategory::BusinessRule,
            Error::Config(_) | Error::Io(_) => ErrorCategory::Configuration,
        }
    }

    /// Whether repeating the same action unchanged could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the caller has to route the user back to sign-in
    pub fn requires_login(&self) -> bool {
        matches!(self, Error::SessionExpired)
    }

    /// Get user-facing error message
    pub fn user_message(&self) -> String {
        match self {
            Error::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            Error::SessionExpired => "Session expired".to_string(),
            Error::Api { message, .. } => message.clone(),
            Error::Rejected(message) => message.clone(),
            _ => self.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            Error::Network(format!("Connection failed: {}", err))
        } else {
            Error::Network(format!("HTTP request error: {}", err))
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON error: {}", err))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(format!("Invalid URL: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("Invalid config file: {}", err))
    }
}
