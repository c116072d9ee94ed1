//! Error types shared across the crate.

use thiserror::Error;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading credentials or configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A mandatory environment variable is absent or blank.
    #[error("{name} not found in environment variables. {hint}")]
    MissingCredential { name: String, hint: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Errors from the conversation API transport.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network / reqwest-level error.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx status from the API.
    #[error("status {code}: {body}")]
    Status {
        code: u16,
        body: String,
        retry_after_secs: Option<u64>,
    },
    /// The body could not be interpreted as a chat response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn status(code: u16, body: String, retry_after_secs: Option<u64>) -> Self {
        Self::Status {
            code,
            body,
            retry_after_secs,
        }
    }

    /// HTTP status code when the error came from a non-2xx response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Server-provided `Retry-After` hint, in seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Status {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// Errors from the profile (GitHub) and music (Spotify) services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{service} authorization failed: {message}")]
    Auth {
        service: &'static str,
        message: String,
    },
    #[error("{service} API returned status {code}: {message}")]
    Status {
        service: &'static str,
        code: u16,
        message: String,
    },
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid {service} response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// ToolError
// ---------------------------------------------------------------------------

/// Errors turning a model tool call into a typed command.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model supplied arguments the tool couldn't parse.
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
    /// The model named a tool that was never advertised.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

// ---------------------------------------------------------------------------
// TurnError (top-level)
// ---------------------------------------------------------------------------

/// Failure of one user turn; rendered at the turn boundary.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Model returned no choices in the response.
    #[error("model returned empty response")]
    EmptyResponse,
}
