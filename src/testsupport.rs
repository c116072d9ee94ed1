//! Shared test fixtures.
//!
//! A tiny loopback HTTP server that replays canned responses in order and
//! records each raw request, plus scripted doubles for the service traits.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::api::ModelClient;
use crate::error::{ApiError, ServiceError};
use crate::services::{
    ContentType, MusicApi, NowPlaying, PlaybackTarget, ProfileApi, ProfileSummary, SearchHit,
    Track,
};
use crate::types::{ChatRequest, ChatResponse};
use crate::ui::{ProgressHandle, RenderSink};

/// Build a raw HTTP/1.1 response with a JSON content type.
pub fn http_response(status: u16, extra_headers: &str, body: &str) -> String {
    let reason = match status {
        200 => "OK",
        204 => "No Content",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        _ => "Status",
    };
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n{extra_headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Loopback server answering one connection per canned response.
pub struct FakeServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Raw requests received so far (request line, headers and body).
    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

/// Start a server that answers successive connections with `responses`.
pub async fn spawn_http_server(responses: Vec<String>) -> FakeServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);

    tokio::spawn(async move {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let raw = read_request(&mut stream).await;
            recorded.lock().await.push(raw);
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    FakeServer { addr, requests }
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Model double that replays queued responses and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    responses: StdMutex<VecDeque<Result<ChatResponse, ApiError>>>,
    requests: StdMutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Result<ChatResponse, ApiError>>) -> Self {
        Self {
            responses: StdMutex::new(responses.into()),
            requests: StdMutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.requests.lock().expect("lock").push(request.clone());
        self.responses
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::InvalidResponse("no mock response queued".into())))
    }
}

/// Sink that records every rendered event as `kind:payload`.
#[derive(Default)]
pub struct RecordingSink {
    events: StdMutex<Vec<String>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("lock").clone()
    }

    fn push(&self, event: String) {
        self.events.lock().expect("lock").push(event);
    }
}

impl RenderSink for RecordingSink {
    fn banner(&self, title: &str, _detail: &str) {
        self.push(format!("banner:{title}"));
    }
    fn prompt(&self) {
        self.push("prompt".into());
    }
    fn reply(&self, label: &str, markdown: &str) {
        self.push(format!("reply:{label}:{markdown}"));
    }
    fn error(&self, msg: &str) {
        self.push(format!("error:{msg}"));
    }
    fn warn(&self, msg: &str) {
        self.push(format!("warn:{msg}"));
    }
    fn info(&self, msg: &str) {
        self.push(format!("info:{msg}"));
    }
    fn tool_call(&self, name: &str, args: &str) {
        self.push(format!("tool_call:{name}:{args}"));
    }
    fn tool_result(&self, result: &str) {
        self.push(format!("tool_result:{result}"));
    }
    fn progress(&self, _label: &str) -> ProgressHandle {
        ProgressHandle::disabled()
    }
    fn goodbye(&self) {
        self.push("goodbye".into());
    }
}

/// Profile double: answers every lookup with a copy of `profile`, or
/// "not found" when none is set.
#[derive(Default)]
pub struct FakeProfiles {
    profile: Option<ProfileSummary>,
    lookups: StdMutex<Vec<String>>,
}

impl FakeProfiles {
    pub fn with_profile(login: &str) -> Self {
        Self {
            profile: Some(sample_profile(login)),
            lookups: StdMutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ProfileApi for FakeProfiles {
    async fn profile_summary(&self, username: &str) -> Result<ProfileSummary, ServiceError> {
        self.lookups.lock().expect("lock").push(username.to_string());
        match &self.profile {
            Some(profile) => Ok(ProfileSummary {
                login: username.to_string(),
                ..profile.clone()
            }),
            None => Err(ServiceError::NotFound(format!(
                "GitHub user '{username}' not found"
            ))),
        }
    }
}

pub fn sample_profile(login: &str) -> ProfileSummary {
    ProfileSummary {
        login: login.to_string(),
        name: Some("The Octocat".into()),
        bio: None,
        company: Some("@github".into()),
        location: Some("San Francisco".into()),
        blog: None,
        public_repos: 8,
        followers: 1000,
        following: 9,
        created_at: Some("2011-01-25T18:44:36Z".into()),
        html_url: format!("https://github.com/{login}"),
        recent_repos: Vec::new(),
    }
}

/// Music double that counts calls and records the arguments that matter.
#[derive(Default)]
pub struct CountingMusic {
    hits: usize,
    playing: bool,
    fail_with: Option<String>,
    calls: StdMutex<Vec<&'static str>>,
    last_target: StdMutex<Option<PlaybackTarget>>,
    last_search: StdMutex<Option<(String, ContentType)>>,
    top_limit: StdMutex<Option<u32>>,
    seed_count: StdMutex<Option<usize>>,
    recommendation_limit: StdMutex<Option<u32>>,
}

impl CountingMusic {
    /// Searches return `hits` results; nothing is playing.
    pub fn with_hits(hits: usize) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    /// Every call fails with a 404 carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn playing(mut self) -> Self {
        self.playing = true;
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls
            .lock()
            .expect("lock")
            .iter()
            .filter(|c| **c == name)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("lock").len()
    }

    pub fn last_target(&self) -> Option<PlaybackTarget> {
        self.last_target.lock().expect("lock").clone()
    }

    pub fn last_search(&self) -> Option<(String, ContentType)> {
        self.last_search.lock().expect("lock").clone()
    }

    pub fn top_limit(&self) -> Option<u32> {
        *self.top_limit.lock().expect("lock")
    }

    pub fn seed_count(&self) -> Option<usize> {
        *self.seed_count.lock().expect("lock")
    }

    pub fn recommendation_limit(&self) -> Option<u32> {
        *self.recommendation_limit.lock().expect("lock")
    }

    fn record(&self, name: &'static str) -> Result<(), ServiceError> {
        self.calls.lock().expect("lock").push(name);
        match &self.fail_with {
            Some(message) => Err(ServiceError::Status {
                service: "Spotify",
                code: 404,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn track(id: String) -> Track {
    Track {
        uri: format!("spotify:track:{id}"),
        id,
        name: "Song".into(),
        artists: vec!["Band".into()],
    }
}

#[async_trait]
impl MusicApi for CountingMusic {
    async fn search(
        &self,
        query: &str,
        kind: ContentType,
        limit: u32,
    ) -> Result<Vec<SearchHit>, ServiceError> {
        self.record("search")?;
        *self.last_search.lock().expect("lock") = Some((query.to_string(), kind));
        Ok((0..self.hits.min(limit as usize))
            .map(|i| SearchHit {
                uri: format!("spotify:{}:hit{i}", kind.as_str()),
                name: format!("Hit {i}"),
                by: Some("Band".into()),
            })
            .collect())
    }

    async fn start_playback(&self, target: PlaybackTarget) -> Result<(), ServiceError> {
        self.record("start_playback")?;
        *self.last_target.lock().expect("lock") = Some(target);
        Ok(())
    }

    async fn pause(&self) -> Result<(), ServiceError> {
        self.record("pause")
    }

    async fn skip_next(&self) -> Result<(), ServiceError> {
        self.record("skip_next")
    }

    async fn skip_previous(&self) -> Result<(), ServiceError> {
        self.record("skip_previous")
    }

    async fn current_playback(&self) -> Result<Option<NowPlaying>, ServiceError> {
        self.record("current_playback")?;
        Ok(self.playing.then(|| NowPlaying {
            is_playing: true,
            track: Some(track("now".into())),
        }))
    }

    async fn top_tracks(&self, limit: u32) -> Result<Vec<Track>, ServiceError> {
        self.record("top_tracks")?;
        *self.top_limit.lock().expect("lock") = Some(limit);
        Ok((0..limit).map(|i| track(format!("top{i}"))).collect())
    }

    async fn recommendations(
        &self,
        seed_track_ids: &[String],
        limit: u32,
    ) -> Result<Vec<Track>, ServiceError> {
        self.record("recommendations")?;
        *self.seed_count.lock().expect("lock") = Some(seed_track_ids.len());
        *self.recommendation_limit.lock().expect("lock") = Some(limit);
        Ok((0..limit).map(|i| track(format!("rec{i}"))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_server_replays_and_records() {
        let server = spawn_http_server(vec![http_response(200, "", r#"{"ok":true}"#)]).await;
        let body = reqwest::Client::new()
            .post(format!("{}/echo", server.base_url()))
            .body("payload")
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, r#"{"ok":true}"#);
        let requests = server.requests().await;
        assert!(requests[0].starts_with("POST /echo"));
        assert!(requests[0].ends_with("payload"));
    }

    #[tokio::test]
    async fn scripted_model_errors_when_exhausted() {
        let model = ScriptedModel::new(Vec::new());
        let request = ChatRequest {
            model: "m".into(),
            messages: Vec::new(),
            tools: None,
            temperature: None,
        };
        assert!(model.chat(&request).await.is_err());
        assert_eq!(model.requests().len(), 1);
    }
}
