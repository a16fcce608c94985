use std::fmt;

/// Failures of a single authentication attempt. None of these reach the broker:
/// the pipeline turns each one into a deny or defer according to configuration.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Config(String),
    Transport(String),
    Response(String),
    TokenInactive,
    UsernameMismatch(String),
    Replacement(String),
}

impl Error {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Transport(_) => "transport",
            Error::Response(_) => "response",
            Error::TokenInactive => "token_inactive",
            Error::UsernameMismatch(_) => "username_mismatch",
            Error::Replacement(_) => "replacement",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(err) => write!(f, "Configuration error: {err}"),
            Error::Transport(err) => write!(f, "Transport error: {err}"),
            Error::Response(err) => write!(f, "Invalid introspection response: {err}"),
            Error::TokenInactive => write!(f, "Token is not active"),
            Error::UsernameMismatch(err) => write!(f, "Username mismatch: {err}"),
            Error::Replacement(err) => write!(f, "Username replacement failed: {err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Transport(error.to_string())
    }
}
