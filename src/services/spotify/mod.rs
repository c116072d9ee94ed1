//! Spotify Web API playback control.
//!
//! [`SpotifyClient`] owns an OAuth token obtained through [`oauth`]; expired
//! tokens are refreshed transparently before the next request.

pub mod oauth;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::Mutex;

use super::error_message_from_body;
use crate::error::ServiceError;
use oauth::{SpotifyAuthorizer, SpotifyToken};

const SERVICE: &str = "Spotify";
const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

/// Searchable catalog item kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Track,
    Album,
    Artist,
    Playlist,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Playlist => "playlist",
        }
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub uri: String,
    pub name: String,
    /// Artists for tracks/albums, owner for playlists.
    pub by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
}

impl Track {
    /// `"Name by A, B"`.
    pub fn describe(&self) -> String {
        if self.artists.is_empty() {
            self.name.clone()
        } else {
            format!("{} by {}", self.name, self.artists.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub is_playing: bool,
    pub track: Option<Track>,
}

/// What a playback-start call should play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackTarget {
    /// Resume whatever the active device had queued.
    Resume,
    Tracks(Vec<String>),
    /// Album, artist or playlist URI.
    Context(String),
}

/// The music-service operations the playback tool needs.
#[async_trait]
pub trait MusicApi: Send + Sync {
    async fn search(
        &self,
        query: &str,
        kind: ContentType,
        limit: u32,
    ) -> Result<Vec<SearchHit>, ServiceError>;
    async fn start_playback(&self, target: PlaybackTarget) -> Result<(), ServiceError>;
    async fn pause(&self) -> Result<(), ServiceError>;
    async fn skip_next(&self) -> Result<(), ServiceError>;
    async fn skip_previous(&self) -> Result<(), ServiceError>;
    async fn current_playback(&self) -> Result<Option<NowPlaying>, ServiceError>;
    async fn top_tracks(&self, limit: u32) -> Result<Vec<Track>, ServiceError>;
    async fn recommendations(
        &self,
        seed_track_ids: &[String],
        limit: u32,
    ) -> Result<Vec<Track>, ServiceError>;
}

/// Spotify Web API client bound to one user's token.
pub struct SpotifyClient {
    http: reqwest::Client,
    api_base: String,
    token: Mutex<SpotifyToken>,
    /// Present when the token can be refreshed.
    authorizer: Option<SpotifyAuthorizer>,
}

impl SpotifyClient {
    pub fn new(token: SpotifyToken, authorizer: Option<SpotifyAuthorizer>, timeout: Duration) -> Self {
        Self::with_api_base(token, authorizer, DEFAULT_API_BASE, timeout)
    }

    pub fn with_api_base(
        token: SpotifyToken,
        authorizer: Option<SpotifyAuthorizer>,
        api_base: &str,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(super::USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: Mutex::new(token),
            authorizer,
        }
    }

    /// Validating call: display name (or id) of the authorized user.
    pub async fn current_user(&self) -> Result<String, ServiceError> {
        let me = self.send(Method::GET, "/me", &[], None).await?;
        me.as_ref()
            .and_then(|v| v.get("display_name").and_then(Value::as_str))
            .or_else(|| me.as_ref().and_then(|v| v.get("id").and_then(Value::as_str)))
            .map(str::to_string)
            .ok_or_else(|| invalid("profile without id"))
    }

    async fn access_token(&self) -> Result<String, ServiceError> {
        let mut token = self.token.lock().await;
        if token.is_expired() {
            if let (Some(authorizer), Some(refresh)) = (&self.authorizer, token.refresh_token.clone()) {
                tracing::debug!("refreshing Spotify access token");
                *token = authorizer.refresh(&refresh).await?;
            }
        }
        Ok(token.access_token.clone())
    }

    /// Send one API request; `None` for empty (204) bodies.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Option<Value>, ServiceError> {
        let token = self.access_token().await?;
        let mut request = self
            .http
            .request(method, format!("{}{path}", self.api_base))
            .bearer_auth(token)
            .query(query);
        request = match body {
            Some(body) => request.json(&body),
            // Spotify's player endpoints require a length even when empty.
            None => request.header(reqwest::header::CONTENT_LENGTH, "0"),
        };

        let response = request.send().await.map_err(|source| ServiceError::Http {
            service: SERVICE,
            source,
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|source| ServiceError::Http {
            service: SERVICE,
            source,
        })?;

        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| invalid(&e.to_string()))
    }
}

fn classify_failure(status: StatusCode, body: &str) -> ServiceError {
    let message = error_message_from_body(body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            ServiceError::RateLimited(format!("Spotify API rate limit exceeded: {message}"))
        }
        StatusCode::UNAUTHORIZED => ServiceError::Auth {
            service: SERVICE,
            message,
        },
        _ => ServiceError::Status {
            service: SERVICE,
            code: status.as_u16(),
            message,
        },
    }
}

fn invalid(message: &str) -> ServiceError {
    ServiceError::InvalidResponse {
        service: SERVICE,
        message: message.to_string(),
    }
}

fn parse_track(value: &Value) -> Option<Track> {
    Some(Track {
        id: value.get("id")?.as_str()?.to_string(),
        uri: value.get("uri")?.as_str()?.to_string(),
        name: value.get("name")?.as_str()?.to_string(),
        artists: artist_names(value),
    })
}

fn artist_names(value: &Value) -> Vec<String> {
    value
        .get("artists")
        .and_then(Value::as_array)
        .map(|artists| {
            artists
                .iter()
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_tracks(list: Option<&Value>) -> Vec<Track> {
    list.and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_track).collect())
        .unwrap_or_default()
}

fn parse_hit(value: &Value) -> Option<SearchHit> {
    let artists = artist_names(value);
    let by = if artists.is_empty() {
        value
            .pointer("/owner/display_name")
            .and_then(Value::as_str)
            .map(str::to_string)
    } else {
        Some(artists.join(", "))
    };
    Some(SearchHit {
        uri: value.get("uri")?.as_str()?.to_string(),
        name: value.get("name")?.as_str()?.to_string(),
        by,
    })
}

#[async_trait]
impl MusicApi for SpotifyClient {
    async fn search(
        &self,
        query: &str,
        kind: ContentType,
        limit: u32,
    ) -> Result<Vec<SearchHit>, ServiceError> {
        let body = self
            .send(
                Method::GET,
                "/search",
                &[
                    ("q", query.to_string()),
                    ("type", kind.as_str().to_string()),
                    ("limit", limit.to_string()),
                ],
                None,
            )
            .await?;
        // Results live under the pluralized type; playlist items may be null.
        let pointer = format!("/{}s/items", kind.as_str());
        Ok(body
            .as_ref()
            .and_then(|b| b.pointer(&pointer))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_hit).collect())
            .unwrap_or_default())
    }

    async fn start_playback(&self, target: PlaybackTarget) -> Result<(), ServiceError> {
        let body = match target {
            PlaybackTarget::Resume => None,
            PlaybackTarget::Tracks(uris) => Some(json!({ "uris": uris })),
            PlaybackTarget::Context(uri) => Some(json!({ "context_uri": uri })),
        };
        self.send(Method::PUT, "/me/player/play", &[], body).await?;
        Ok(())
    }

    async fn pause(&self) -> Result<(), ServiceError> {
        self.send(Method::PUT, "/me/player/pause", &[], None).await?;
        Ok(())
    }

    async fn skip_next(&self) -> Result<(), ServiceError> {
        self.send(Method::POST, "/me/player/next", &[], None).await?;
        Ok(())
    }

    async fn skip_previous(&self) -> Result<(), ServiceError> {
        self.send(Method::POST, "/me/player/previous", &[], None)
            .await?;
        Ok(())
    }

    async fn current_playback(&self) -> Result<Option<NowPlaying>, ServiceError> {
        let body = self.send(Method::GET, "/me/player", &[], None).await?;
        Ok(body.map(|state| NowPlaying {
            is_playing: state
                .get("is_playing")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            track: state.get("item").and_then(parse_track),
        }))
    }

    async fn top_tracks(&self, limit: u32) -> Result<Vec<Track>, ServiceError> {
        let body = self
            .send(
                Method::GET,
                "/me/top/tracks",
                &[("limit", limit.to_string())],
                None,
            )
            .await?;
        Ok(parse_tracks(body.as_ref().and_then(|b| b.get("items"))))
    }

    async fn recommendations(
        &self,
        seed_track_ids: &[String],
        limit: u32,
    ) -> Result<Vec<Track>, ServiceError> {
        let body = self
            .send(
                Method::GET,
                "/recommendations",
                &[
                    ("seed_tracks", seed_track_ids.join(",")),
                    ("limit", limit.to_string()),
                ],
                None,
            )
            .await?;
        Ok(parse_tracks(body.as_ref().and_then(|b| b.get("tracks"))))
    }
}
