use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitCorpusError {
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    #[error("HTTP {status}: {body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Network error: {message}")]
    Transport { url: String, message: String },

    #[error("Request timed out after {seconds} seconds")]
    Timeout { url: String, seconds: u64 },

    #[error("Unsupported encoding {encoding} for file {path}")]
    UnsupportedEncoding { path: String, encoding: String },

    #[error("Error decoding file {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Unexpected response format from {url}: {message}")]
    UnexpectedPayload { url: String, message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),
}

impl GitCorpusError {
    /// Errors that only affect a single tree node and never abort a walk.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GitCorpusError::Http { .. }
                | GitCorpusError::Transport { .. }
                | GitCorpusError::Timeout { .. }
                | GitCorpusError::UnsupportedEncoding { .. }
                | GitCorpusError::Decode { .. }
                | GitCorpusError::UnexpectedPayload { .. }
        )
    }

    pub fn invalid_input<I: Into<String>, R: Into<String>>(input: I, reason: R) -> Self {
        GitCorpusError::InvalidInput {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for GitCorpusError {
    fn user_message(&self) -> String {
        match self {
            GitCorpusError::InvalidInput { input, reason } => {
                format!("Invalid input '{}': {}", input, reason)
            }
            GitCorpusError::Http { url, status, .. } => match status {
                401 | 403 => format!("Access denied or rate limited (HTTP {}): {}", status, url),
                404 => format!("Not found (HTTP 404): {}", url),
                _ => format!("Request failed with HTTP {}: {}", status, url),
            },
            GitCorpusError::Transport { url, message } => {
                format!("Network error while fetching {}: {}", url, message)
            }
            GitCorpusError::Timeout { url, seconds } => {
                format!("Request to {} timed out after {} seconds", url, seconds)
            }
            GitCorpusError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            GitCorpusError::InvalidInput { .. } => Some(
                "Enter a repository URL like https://github.com/user/repo, or a GitHub username with --user.".to_string()
            ),
            GitCorpusError::Http { status: 401 | 403, .. } => Some(
                "Unauthenticated requests are heavily rate limited. Set the GITHUB_TOKEN environment variable or pass --token.".to_string()
            ),
            GitCorpusError::Http { status: 404, .. } => Some(
                "Verify the repository or user exists and is public, or provide a token with access to it.".to_string()
            ),
            GitCorpusError::Transport { .. } => Some(
                "Check your internet connection and try again.".to_string()
            ),
            GitCorpusError::Timeout { .. } => Some(
                "The API took longer than expected. Try again or increase the timeout with --timeout.".to_string()
            ),
            GitCorpusError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all values are valid.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GitCorpusError {
    fn from(error: reqwest::Error) -> Self {
        let url = error
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if error.is_timeout() {
            GitCorpusError::Timeout { url, seconds: 0 }
        } else {
            GitCorpusError::Transport {
                url,
                message: error.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for GitCorpusError {
    fn from(error: url::ParseError) -> Self {
        GitCorpusError::Config {
            message: format!("invalid URL: {}", error),
        }
    }
}

impl From<toml::de::Error> for GitCorpusError {
    fn from(error: toml::de::Error) -> Self {
        GitCorpusError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GitCorpusError>;
