//! `spotify_control`: playback commands against a [`MusicApi`].

use serde::Deserialize;

use crate::error::ServiceError;
use crate::services::{ContentType, MusicApi, PlaybackTarget};
use crate::types::{FunctionDefinition, ToolDefinition};

pub const NAME: &str = "spotify_control";

/// Fixed query behind the `coding` command.
pub const CODING_QUERY: &str = "coding focus";
pub const TOP_TRACK_LIMIT: u32 = 5;
pub const SEED_LIMIT: usize = 2;
pub const RECOMMENDATION_LIMIT: u32 = 5;

pub const NO_ACTIVE_DEVICE_MESSAGE: &str =
    "No active Spotify device found. Open Spotify on a device and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackCommand {
    Play,
    Pause,
    Next,
    Previous,
    Current,
    Coding,
    Recommend,
}

/// Typed `spotify_control` arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaybackRequest {
    pub command: PlaybackCommand,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, deserialize_with = "content_type_or_default")]
    pub content_type: ContentType,
}

impl PlaybackRequest {
    pub fn new(command: PlaybackCommand) -> Self {
        Self {
            command,
            query: None,
            content_type: ContentType::default(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// The search query, if one with visible characters was given.
    fn search_query(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

// Models sometimes send `"content_type": null`.
fn content_type_or_default<'de, D>(deserializer: D) -> Result<ContentType, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<ContentType>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        tool_type: "function".into(),
        function: FunctionDefinition {
            name: NAME.into(),
            description: "Control Spotify playback for the user: play music (optionally searching for a track, album, artist or playlist), pause, skip to the next or previous track, show what is currently playing, start a coding-focus playlist, or play recommendations based on the user's top tracks."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "enum": ["play", "pause", "next", "previous", "current", "coding", "recommend"],
                        "description": "Playback action to perform"
                    },
                    "query": {
                        "type": "string",
                        "description": "Search query for the play command"
                    },
                    "content_type": {
                        "type": "string",
                        "enum": ["track", "album", "artist", "playlist"],
                        "description": "What kind of item the query names (default track)"
                    }
                },
                "required": ["command"]
            }),
        },
    }
}

/// Execute one playback request, returning a short status line.
pub async fn run(api: &dyn MusicApi, request: &PlaybackRequest) -> Result<String, ServiceError> {
    match request.command {
        PlaybackCommand::Play => match request.search_query() {
            Some(query) => play_search(api, query, request.content_type).await,
            None => {
                api.start_playback(PlaybackTarget::Resume).await?;
                Ok("Resumed playback".into())
            }
        },
        PlaybackCommand::Pause => match api.current_playback().await? {
            Some(state) if state.is_playing => {
                api.pause().await?;
                Ok("Paused playback".into())
            }
            _ => Ok("Nothing is playing".into()),
        },
        PlaybackCommand::Next => {
            api.skip_next().await?;
            Ok("Skipped to next track".into())
        }
        PlaybackCommand::Previous => {
            api.skip_previous().await?;
            Ok("Went back to previous track".into())
        }
        PlaybackCommand::Current => Ok(match api.current_playback().await? {
            Some(state) => match state.track {
                Some(track) if state.is_playing => format!("Currently playing: {}", track.describe()),
                Some(track) => format!("Paused on: {}", track.describe()),
                None => "Nothing is currently playing".into(),
            },
            None => "Nothing is currently playing".into(),
        }),
        PlaybackCommand::Coding => play_search(api, CODING_QUERY, ContentType::Playlist).await,
        PlaybackCommand::Recommend => recommend(api).await,
    }
}

async fn play_search(
    api: &dyn MusicApi,
    query: &str,
    kind: ContentType,
) -> Result<String, ServiceError> {
    let Some(hit) = api.search(query, kind, 1).await?.into_iter().next() else {
        return Ok(format!("Could not find {} matching '{query}'", kind.as_str()));
    };
    let target = match kind {
        ContentType::Track => PlaybackTarget::Tracks(vec![hit.uri.clone()]),
        _ => PlaybackTarget::Context(hit.uri.clone()),
    };
    api.start_playback(target).await?;
    Ok(match hit.by {
        Some(by) => format!("Now playing {}: {} by {by}", kind.as_str(), hit.name),
        None => format!("Now playing {}: {}", kind.as_str(), hit.name),
    })
}

async fn recommend(api: &dyn MusicApi) -> Result<String, ServiceError> {
    let top = api.top_tracks(TOP_TRACK_LIMIT).await?;
    let seeds: Vec<String> = top.iter().take(SEED_LIMIT).map(|t| t.id.clone()).collect();
    if seeds.is_empty() {
        return Ok("No listening history available to base recommendations on".into());
    }
    let tracks = api.recommendations(&seeds, RECOMMENDATION_LIMIT).await?;
    if tracks.is_empty() {
        return Ok("Spotify returned no recommendations".into());
    }
    let names: Vec<String> = tracks.iter().map(|t| t.describe()).collect();
    api.start_playback(PlaybackTarget::Tracks(
        tracks.into_iter().map(|t| t.uri).collect(),
    ))
    .await?;
    Ok(format!("Playing recommendations: {}", names.join("; ")))
}

/// Rephrase the "no active device" failure; other errors keep their message.
pub fn describe_failure(err: &ServiceError) -> String {
    let text = err.to_string();
    let lowered = text.to_lowercase();
    if lowered.contains("no active device") || lowered.contains("no_active_device") {
        NO_ACTIVE_DEVICE_MESSAGE.to_string()
    } else {
        text
    }
}
