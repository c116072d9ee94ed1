//! Tools the model can call in `tools` mode.
//!
//! The wire-level tool call (a name plus a JSON argument string) is parsed
//! once into the closed [`ToolCommand`] enum, then executed against the
//! service handles held by [`ToolExecutor`]. Failures never escape as
//! errors: they become a [`ToolResult::Error`] the model gets to see.

pub mod github;
pub mod spotify;

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{
    GITHUB_TOKEN_VAR, SPOTIFY_CLIENT_ID_VAR, SPOTIFY_CLIENT_SECRET_VAR, SPOTIFY_REDIRECT_URI_VAR,
};
use crate::error::ToolError;
use crate::services::{MusicApi, ProfileApi};
use crate::types::{FunctionCall, ToolDefinition};

pub use spotify::{PlaybackCommand, PlaybackRequest};

/// Descriptors advertised on the first request of a tool turn.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![github::definition(), spotify::definition()]
}

/// A parsed, validated tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCommand {
    GithubUser { username: String },
    SpotifyControl(PlaybackRequest),
}

impl ToolCommand {
    pub fn from_call(call: &FunctionCall) -> Result<Self, ToolError> {
        let arguments = if call.arguments.trim().is_empty() {
            "{}"
        } else {
            call.arguments.as_str()
        };
        let invalid = |e: serde_json::Error| ToolError::InvalidArguments {
            tool: call.name.clone(),
            message: e.to_string(),
        };
        match call.name.as_str() {
            github::NAME => {
                let args: github::Arguments = serde_json::from_str(arguments).map_err(invalid)?;
                Ok(Self::GithubUser {
                    username: args.username,
                })
            }
            spotify::NAME => Ok(Self::SpotifyControl(
                serde_json::from_str(arguments).map_err(invalid)?,
            )),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

/// Outcome sent back to the model, serialized as `{"result": ..}` or
/// `{"error": ".."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ToolResult {
    #[serde(rename = "result")]
    Value(Value),
    #[serde(rename = "error")]
    Error(String),
}

impl ToolResult {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"error":"failed to serialize tool result: {e}"}}"#)
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Dispatches tool commands to whichever services are configured.
#[derive(Clone, Default)]
pub struct ToolExecutor {
    github: Option<Arc<dyn ProfileApi>>,
    spotify: Option<Arc<dyn MusicApi>>,
}

impl ToolExecutor {
    pub fn new(github: Option<Arc<dyn ProfileApi>>, spotify: Option<Arc<dyn MusicApi>>) -> Self {
        Self { github, spotify }
    }

    pub fn github(&self) -> Option<&dyn ProfileApi> {
        self.github.as_deref()
    }

    /// Parse and run one wire-level call.
    pub async fn execute(&self, call: &FunctionCall) -> ToolResult {
        match ToolCommand::from_call(call) {
            Ok(command) => self.run(&command).await,
            Err(err) => {
                tracing::warn!(tool = %call.name, error = %err, "rejected tool call");
                ToolResult::Error(err.to_string())
            }
        }
    }

    pub async fn run(&self, command: &ToolCommand) -> ToolResult {
        match command {
            ToolCommand::GithubUser { username } => {
                let Some(api) = self.github.as_deref() else {
                    return ToolResult::Error(format!(
                        "GitHub integration is disabled; set {GITHUB_TOKEN_VAR} to enable profile lookups"
                    ));
                };
                match github::run(api, username).await {
                    Ok(summary) => serde_json::to_value(summary)
                        .map(ToolResult::Value)
                        .unwrap_or_else(|e| ToolResult::Error(e.to_string())),
                    Err(err) => ToolResult::Error(err.to_string()),
                }
            }
            ToolCommand::SpotifyControl(request) => {
                let Some(api) = self.spotify.as_deref() else {
                    return ToolResult::Error(format!(
                        "Spotify integration is disabled; set {SPOTIFY_CLIENT_ID_VAR}, {SPOTIFY_CLIENT_SECRET_VAR} and {SPOTIFY_REDIRECT_URI_VAR} to enable playback control"
                    ));
                };
                match spotify::run(api, request).await {
                    Ok(status) => ToolResult::Value(Value::String(status)),
                    Err(err) => ToolResult::Error(spotify::describe_failure(&err)),
                }
            }
        }
    }
}
