//! Default configuration constants.
//!
//! Keeping defaults in one module lets callers share the same constants
//! without duplicating literals.

/// Config file looked up in the working directory when `--config` is absent.
pub(super) const DEFAULT_CONFIG_FILE_NAME: &str = "codebeat.toml";

/// Primary conversation API (OpenAI-compatible endpoint).
pub(super) const DEFAULT_API_BASE_URL: &str = "https://api.reka.ai/v1";
pub(super) const DEFAULT_MODEL_ID: &str = "reka-core-20240501";
pub(super) const DEFAULT_PROVIDER_LABEL: &str = "Reka AI";

/// Second provider, only used by compare mode.
pub(super) const DEFAULT_SECONDARY_BASE_URL: &str = "https://api.openai.com/v1";
pub(super) const DEFAULT_SECONDARY_MODEL_ID: &str = "gpt-4o-mini";
pub(super) const DEFAULT_SECONDARY_LABEL: &str = "OpenAI";

/// Default timeout for conversation API requests.
pub(super) const DEFAULT_API_TIMEOUT_SECS: u64 = 120;
/// How long to wait for the Spotify consent redirect.
pub(super) const DEFAULT_OAUTH_TIMEOUT_SECS: u64 = 120;

pub(super) const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful, concise assistant for software developers. Answer in markdown.";

/// Accepted range for `[conversation] temperature`.
pub(super) const MIN_TEMPERATURE: f64 = 0.0;
pub(super) const MAX_TEMPERATURE: f64 = 2.0;
