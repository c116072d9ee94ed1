//! Client factory: turns configuration and credentials into the handles a
//! run mode needs.
//!
//! Optional services are probed once; any failure leaves the handle absent
//! and produces a warning instead of aborting startup.

use std::sync::Arc;
use std::time::Duration;

use crate::api::ApiClient;
use crate::assistant::{Assistant, Provider};
use crate::config::{Config, Credentials, RunMode, SpotifyCredentials, SECONDARY_KEY_VAR};
use crate::services::browser::try_open_browser;
use crate::services::spotify::oauth::SpotifyAuthorizer;
use crate::services::{GitHubClient, MusicApi, ProfileApi, SpotifyClient};
use crate::tools::ToolExecutor;
use crate::ui::RenderSink;

/// Every handle built for one run.
pub struct Clients {
    pub primary: Provider,
    pub secondary: Option<Provider>,
    pub tools: ToolExecutor,
}

impl Clients {
    pub fn into_assistant(self, mode: RunMode, system_prompt: &str) -> Assistant {
        let assistant = Assistant::new(mode, self.primary, system_prompt).with_tools(self.tools);
        match self.secondary {
            Some(secondary) => assistant.with_secondary(secondary),
            None => assistant,
        }
    }
}

/// Build the conversation client and whichever optional services `mode` uses.
pub async fn build_clients(
    mode: RunMode,
    config: &Config,
    credentials: &Credentials,
    sink: &dyn RenderSink,
) -> Clients {
    let api_timeout = Duration::from_secs(config.network.api_timeout_secs);

    let primary_api = config.conversation.with_key(&credentials.conversation_key);
    let primary = Provider::new(
        primary_api.label.clone(),
        primary_api.model.clone(),
        Arc::new(ApiClient::new(&primary_api, api_timeout)),
    );

    let secondary = if mode == RunMode::Compare {
        match credentials.secondary_key.as_deref() {
            Some(key) => {
                let api = config.secondary.with_key(key);
                Some(Provider::new(
                    api.label.clone(),
                    api.model.clone(),
                    Arc::new(ApiClient::new(&api, api_timeout)),
                ))
            }
            None => {
                sink.warn(&format!(
                    "compare mode will only query {} until {SECONDARY_KEY_VAR} is set",
                    primary.label
                ));
                None
            }
        }
    } else {
        None
    };

    let github = match credentials.github_token.as_deref() {
        Some(token) if mode.uses_github() => {
            connect_github(GitHubClient::new(token, api_timeout), sink).await
        }
        _ => None,
    };

    let spotify = match &credentials.spotify {
        Some(spotify) if mode.uses_spotify() => {
            connect_spotify(
                spotify,
                api_timeout,
                Duration::from_secs(config.network.oauth_timeout_secs),
                sink,
            )
            .await
        }
        _ => None,
    };

    Clients {
        primary,
        secondary,
        tools: ToolExecutor::new(github, spotify),
    }
}

/// Probe GitHub with the token; `None` (plus a warning) when it fails.
pub async fn connect_github(client: GitHubClient, sink: &dyn RenderSink) -> Option<Arc<dyn ProfileApi>> {
    match client.authenticated_login().await {
        Ok(login) => {
            sink.info(&format!("Connected to GitHub as {login}"));
            Some(Arc::new(client))
        }
        Err(err) => {
            tracing::warn!(error = %err, "GitHub probe failed");
            sink.warn(&format!("GitHub integration disabled: {err}"));
            None
        }
    }
}

async fn connect_spotify(
    credentials: &SpotifyCredentials,
    api_timeout: Duration,
    oauth_timeout: Duration,
    sink: &dyn RenderSink,
) -> Option<Arc<dyn MusicApi>> {
    let authorizer = SpotifyAuthorizer::new(credentials.clone(), api_timeout);
    let token = authorizer
        .authorize_interactive(oauth_timeout, |url| {
            sink.info("Authorize Spotify access in your browser:");
            sink.info(url.as_str());
            if !try_open_browser(url.as_str()) {
                sink.info("Could not open a browser; open the URL above manually.");
            }
        })
        .await;
    let token = match token {
        Ok(token) => token,
        Err(err) => {
            tracing::warn!(error = %err, "Spotify authorization failed");
            sink.warn(&format!("Spotify integration disabled: {err}"));
            return None;
        }
    };

    let client = SpotifyClient::new(token, Some(authorizer), api_timeout);
    match client.current_user().await {
        Ok(user) => {
            sink.info(&format!("Connected to Spotify as {user}"));
            Some(Arc::new(client))
        }
        Err(err) => {
            tracing::warn!(error = %err, "Spotify probe failed");
            sink.warn(&format!("Spotify integration disabled: {err}"));
            None
        }
    }
}
