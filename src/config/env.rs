//! Credential loading and environment overrides.
//!
//! Secrets only ever come from the environment (optionally seeded from a
//! `.env` file by the binary). Every lookup goes through an injected closure
//! so tests never touch the process environment.

use crate::error::ConfigError;

use super::{Config, RunMode};

pub const CONVERSATION_KEY_VAR: &str = "REKA_API_KEY";
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const SPOTIFY_CLIENT_ID_VAR: &str = "SPOTIFY_CLIENT_ID";
pub const SPOTIFY_CLIENT_SECRET_VAR: &str = "SPOTIFY_CLIENT_SECRET";
pub const SPOTIFY_REDIRECT_URI_VAR: &str = "SPOTIFY_REDIRECT_URI";
pub const SECONDARY_KEY_VAR: &str = "OPENAI_API_KEY";

const BASE_URL_VAR: &str = "CODEBEAT_BASE_URL";
const MODEL_VAR: &str = "CODEBEAT_MODEL";
const API_TIMEOUT_VAR: &str = "CODEBEAT_API_TIMEOUT_SECS";

/// OAuth client parameters for the music service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Every credential the current run mode may use.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub conversation_key: String,
    pub github_token: Option<String>,
    pub spotify: Option<SpotifyCredentials>,
    pub secondary_key: Option<String>,
}

/// Credentials plus the warnings produced while loading them.
#[derive(Debug, Clone, Default)]
pub struct LoadedCredentials {
    pub credentials: Credentials,
    /// One line per disabled optional feature.
    pub warnings: Vec<String>,
}

/// Required/optional environment lookups with uniform messaging.
pub struct CredentialLoader<F> {
    lookup: F,
    warnings: Vec<String>,
}

impl<F> CredentialLoader<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F) -> Self {
        Self {
            lookup,
            warnings: Vec::new(),
        }
    }

    fn value(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Return the value of a mandatory variable.
    pub fn require(&self, name: &str, hint: &str) -> Result<String, ConfigError> {
        self.value(name)
            .ok_or_else(|| ConfigError::MissingCredential {
                name: name.to_string(),
                hint: hint.to_string(),
            })
    }

    /// Return the value of an optional variable, recording a warning that
    /// `feature` is disabled when it is absent.
    pub fn optional(&mut self, name: &str, feature: &str) -> Option<String> {
        let value = self.value(name);
        if value.is_none() {
            self.warn(format!("{name} not set; {feature} disabled"));
        }
        value
    }

    /// All-or-nothing lookup for a group of variables feeding one feature.
    pub fn optional_group<const N: usize>(
        &mut self,
        names: [&str; N],
        feature: &str,
    ) -> Option<[String; N]> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| self.value(name).is_none())
            .collect();
        if !missing.is_empty() {
            self.warn(format!("{} not set; {feature} disabled", missing.join(", ")));
            return None;
        }
        Some(names.map(|name| self.value(name).unwrap_or_default()))
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

/// Load the credentials used by `mode`.
///
/// Fails only when the conversation key is missing; absent optional
/// credentials turn into warnings.
pub fn load_credentials<F>(mode: RunMode, lookup: F) -> Result<LoadedCredentials, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut loader = CredentialLoader::new(lookup);
    let conversation_key = loader.require(
        CONVERSATION_KEY_VAR,
        "Create a .env file with your API key: REKA_API_KEY=your_key_here",
    )?;

    let github_token = if mode.uses_github() {
        loader.optional(GITHUB_TOKEN_VAR, "GitHub profile lookup")
    } else {
        None
    };

    let spotify = if mode.uses_spotify() {
        loader
            .optional_group(
                [
                    SPOTIFY_CLIENT_ID_VAR,
                    SPOTIFY_CLIENT_SECRET_VAR,
                    SPOTIFY_REDIRECT_URI_VAR,
                ],
                "Spotify playback control",
            )
            .map(|[client_id, client_secret, redirect_uri]| SpotifyCredentials {
                client_id,
                client_secret,
                redirect_uri,
            })
    } else {
        None
    };

    let secondary_key = if mode == RunMode::Compare {
        loader.optional(SECONDARY_KEY_VAR, "second provider in compare mode")
    } else {
        None
    };

    Ok(LoadedCredentials {
        credentials: Credentials {
            conversation_key,
            github_token,
            spotify,
            secondary_key,
        },
        warnings: loader.into_warnings(),
    })
}

/// Apply `CODEBEAT_*` overrides on top of file/default values.
pub(super) fn apply_runtime_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(url) = env_lookup(BASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
        config.conversation.base_url = url.trim().to_string();
    }
    if let Some(model) = env_lookup(MODEL_VAR).filter(|v| !v.trim().is_empty()) {
        config.conversation.model = model.trim().to_string();
    }
    if let Some(timeout) = env_lookup(API_TIMEOUT_VAR) {
        let parsed = timeout.trim().parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid {API_TIMEOUT_VAR} value `{timeout}`: expected positive integer seconds"
            ))
        })?;
        // Clamp to at least 1 second so a zero never means "no timeout".
        config.network.api_timeout_secs = parsed.max(1);
    }
    Ok(())
}
