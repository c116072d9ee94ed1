//! Runtime configuration.
//!
//! Precedence, lowest first: built-in defaults, an optional TOML file
//! (`--config`, else `./codebeat.toml` when present), `CODEBEAT_*` env
//! overrides, then CLI flags (applied by the binary). Secrets are never read
//! from the file; see [`env`] for the credential loader.

mod defaults;
pub mod env;

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use defaults::*;

pub use env::{
    load_credentials, CredentialLoader, Credentials, LoadedCredentials, SpotifyCredentials,
    CONVERSATION_KEY_VAR, GITHUB_TOKEN_VAR, SECONDARY_KEY_VAR, SPOTIFY_CLIENT_ID_VAR,
    SPOTIFY_CLIENT_SECRET_VAR, SPOTIFY_REDIRECT_URI_VAR,
};

/// Which demo behavior the message loop runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RunMode {
    /// Plain chat, no integrations.
    Chat,
    /// Pattern-matched GitHub username lookup before each request.
    Lookup,
    /// Structured tool calling with GitHub and Spotify.
    #[default]
    Tools,
    /// Every message goes to two providers.
    Compare,
}

impl RunMode {
    /// Name as accepted by `--mode`.
    pub fn name(self) -> String {
        clap::ValueEnum::to_possible_value(&self)
            .map(|value| value.get_name().to_string())
            .unwrap_or_default()
    }

    pub fn uses_github(self) -> bool {
        matches!(self, Self::Lookup | Self::Tools)
    }

    pub fn uses_spotify(self) -> bool {
        self == Self::Tools
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Primary conversation provider.
    pub conversation: ProviderConfig,
    /// Second provider for compare mode.
    pub secondary: ProviderConfig,
    pub system_prompt: String,
    /// Sampling temperature sent with every request; provider default when unset.
    pub temperature: Option<f64>,
    pub network: NetworkConfig,
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            conversation: ProviderConfig {
                label: DEFAULT_PROVIDER_LABEL.into(),
                base_url: DEFAULT_API_BASE_URL.into(),
                model: DEFAULT_MODEL_ID.into(),
            },
            secondary: ProviderConfig {
                label: DEFAULT_SECONDARY_LABEL.into(),
                base_url: DEFAULT_SECONDARY_BASE_URL.into(),
                model: DEFAULT_SECONDARY_MODEL_ID.into(),
            },
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            temperature: None,
            network: NetworkConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

/// Non-secret settings of one OpenAI-compatible provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Name shown above this provider's replies.
    pub label: String,
    pub base_url: String,
    pub model: String,
}

impl ProviderConfig {
    /// Pair these settings with a credential for client construction.
    pub fn with_key(&self, api_key: impl Into<String>) -> ApiConfig {
        ApiConfig {
            label: self.label.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: api_key.into(),
        }
    }
}

/// Resolved API connection settings used by the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub label: String,
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub api_timeout_secs: u64,
    pub oauth_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            oauth_timeout_secs: DEFAULT_OAUTH_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    pub color: bool,
    /// Show a spinner on stderr while requests are in flight.
    pub spinner: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            spinner: true,
        }
    }
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    conversation: FileProvider,
    secondary: FileProvider,
    network: FileNetwork,
    display: FileDisplay,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileProvider {
    label: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    system_prompt: Option<String>,
    temperature: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileNetwork {
    api_timeout_secs: Option<u64>,
    oauth_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileDisplay {
    color: Option<bool>,
    spinner: Option<bool>,
}

fn normalized(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn merge_provider(target: &mut ProviderConfig, file: FileProvider) {
    if let Some(label) = normalized(file.label) {
        target.label = label;
    }
    if let Some(url) = normalized(file.base_url) {
        target.base_url = url;
    }
    if let Some(model) = normalized(file.model) {
        target.model = model;
    }
}

fn resolve_file_config(parsed: FileConfig) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    if parsed.secondary.system_prompt.is_some() {
        return Err(ConfigError::Invalid(
            "`system_prompt` is only supported under [conversation]".into(),
        ));
    }
    if parsed.secondary.temperature.is_some() {
        return Err(ConfigError::Invalid(
            "`temperature` is only supported under [conversation]".into(),
        ));
    }
    if let Some(prompt) = normalized(parsed.conversation.system_prompt.clone()) {
        config.system_prompt = prompt;
    }
    if let Some(temperature) = parsed.conversation.temperature {
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature {temperature} is outside {MIN_TEMPERATURE}..={MAX_TEMPERATURE}"
            )));
        }
        config.temperature = Some(temperature);
    }
    merge_provider(&mut config.conversation, parsed.conversation);
    merge_provider(&mut config.secondary, parsed.secondary);
    if let Some(secs) = parsed.network.api_timeout_secs {
        config.network.api_timeout_secs = secs.max(1);
    }
    if let Some(secs) = parsed.network.oauth_timeout_secs {
        config.network.oauth_timeout_secs = secs.max(1);
    }
    if let Some(color) = parsed.display.color {
        config.display.color = color;
    }
    if let Some(spinner) = parsed.display.spinner {
        config.display.spinner = spinner;
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from `--config`); it
/// must exist. Without it, `./codebeat.toml` is used when present.
pub fn load_config(path_override: Option<&Path>) -> Result<Config, ConfigError> {
    load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        || std::env::current_dir().ok(),
    )
}

pub(crate) fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&Path>,
    read_file: FRead,
    env_lookup: FEnv,
    working_dir: FRoot,
) -> Result<Config, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let text = match path_override {
        Some(path) => Some(read_file(path)?),
        None => working_dir()
            .map(|dir| dir.join(DEFAULT_CONFIG_FILE_NAME))
            .and_then(|path| match read_file(&path) {
                Ok(text) => Some(Ok(text)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => Some(Err(e)),
            })
            .transpose()?,
    };

    let mut config = match text {
        Some(text) => {
            tracing::debug!("loaded configuration file");
            resolve_file_config(toml::from_str(&text)?)?
        }
        None => Config::default(),
    };
    env::apply_runtime_env_overrides(&mut config, &env_lookup)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        let owned = text.to_string();
        load_config_from_sources(
            Some(Path::new("codebeat.toml")),
            move |_| Ok(owned.clone()),
            |_| None,
            || None,
        )
    }

    #[test]
    fn defaults_are_sensible() {
        let c = Config::default();
        assert_eq!(c.conversation.base_url, "https://api.reka.ai/v1");
        assert_eq!(c.conversation.model, "reka-core-20240501");
        assert_eq!(c.conversation.label, "Reka AI");
        assert_eq!(c.secondary.base_url, "https://api.openai.com/v1");
        assert_eq!(c.network.api_timeout_secs, 120);
        assert!(c.display.color);
        assert!(c.display.spinner);
    }

    #[test]
    fn parse_partial_toml() {
        let c = parse(
            r#"
            [conversation]
            model = "reka-flash"
            system_prompt = "Be terse."

            [display]
            spinner = false
        "#,
        )
        .unwrap();
        assert_eq!(c.conversation.model, "reka-flash");
        assert_eq!(c.conversation.base_url, "https://api.reka.ai/v1");
        assert_eq!(c.system_prompt, "Be terse.");
        assert!(!c.display.spinner);
        assert!(c.display.color);
    }

    #[test]
    fn parse_secondary_and_network() {
        let c = parse(
            r#"
            [secondary]
            label = "Local"
            base_url = "http://localhost:11434/v1"
            model = "llama3"

            [network]
            api_timeout_secs = 45
            oauth_timeout_secs = 0
        "#,
        )
        .unwrap();
        assert_eq!(c.secondary.label, "Local");
        assert_eq!(c.secondary.model, "llama3");
        assert_eq!(c.network.api_timeout_secs, 45);
        assert_eq!(c.network.oauth_timeout_secs, 1);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let c = parse("[conversation]\nmodel = \"  \"\n").unwrap();
        assert_eq!(c.conversation.model, "reka-core-20240501");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse("[conversation]\napi_key = \"secret\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)), "got: {err}");
    }

    #[test]
    fn conversation_temperature_is_read_and_bounded() {
        assert_eq!(Config::default().temperature, None);
        let c = parse("[conversation]\ntemperature = 0.3\n").unwrap();
        assert_eq!(c.temperature, Some(0.3));

        let err = parse("[conversation]\ntemperature = 3.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got: {err}");
        let err = parse("[secondary]\ntemperature = 0.3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got: {err}");
    }

    #[test]
    fn secondary_system_prompt_is_invalid() {
        let err = parse("[secondary]\nsystem_prompt = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_default_file_uses_defaults() {
        let c = load_config_from_sources(
            None,
            |_| Err(io::Error::new(io::ErrorKind::NotFound, "absent")),
            |_| None,
            || Some(PathBuf::from("/work")),
        )
        .unwrap();
        assert_eq!(c.conversation.model, "reka-core-20240501");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config_from_sources(
            Some(Path::new("/nope/codebeat.toml")),
            |_| Err(io::Error::new(io::ErrorKind::NotFound, "absent")),
            |_| None,
            || None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn env_overrides_win_over_file() {
        let c = load_config_from_sources(
            None,
            |_| Ok("[conversation]\nmodel = \"from-file\"\n".to_string()),
            |name| (name == "CODEBEAT_MODEL").then(|| "from-env".to_string()),
            || Some(PathBuf::from("/work")),
        )
        .unwrap();
        assert_eq!(c.conversation.model, "from-env");
    }

    #[test]
    fn provider_with_key_builds_api_config() {
        let api = Config::default().conversation.with_key("k");
        assert_eq!(api.api_key, "k");
        assert_eq!(api.model, "reka-core-20240501");
    }

    #[test]
    fn run_mode_feature_matrix() {
        assert!(RunMode::Tools.uses_github() && RunMode::Tools.uses_spotify());
        assert!(RunMode::Lookup.uses_github() && !RunMode::Lookup.uses_spotify());
        assert!(!RunMode::Chat.uses_github() && !RunMode::Compare.uses_spotify());
        assert_eq!(RunMode::default(), RunMode::Tools);
    }

    #[test]
    fn run_mode_names_match_cli_values() {
        let names: Vec<String> = [
            RunMode::Chat,
            RunMode::Lookup,
            RunMode::Tools,
            RunMode::Compare,
        ]
        .into_iter()
        .map(RunMode::name)
        .collect();
        assert_eq!(names, ["chat", "lookup", "tools", "compare"]);
    }
}
