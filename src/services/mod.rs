//! Clients for the optional third-party services.
//!
//! Each service sits behind a trait ([`ProfileApi`], [`MusicApi`]) so the
//! tool executor can be exercised with doubles.

pub mod browser;
pub mod github;
pub mod spotify;

pub use github::{GitHubClient, ProfileApi, ProfileSummary, RepoSummary};
pub use spotify::{ContentType, MusicApi, NowPlaying, PlaybackTarget, SearchHit, SpotifyClient, Track};

/// User agent sent to every third-party API (GitHub rejects requests without one).
pub(crate) const USER_AGENT: &str = concat!("codebeat/", env!("CARGO_PKG_VERSION"));

/// Pull a human-readable message out of a JSON error body.
///
/// Understands `{"message": ..}` (GitHub) and `{"error": {"message": ..,
/// "reason": ..}}` / `{"error": "..", "error_description": ..}` (Spotify).
pub(crate) fn error_message_from_body(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
        return message.to_string();
    }
    match value.get("error") {
        Some(serde_json::Value::Object(error)) => {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            match error.get("reason").and_then(|r| r.as_str()) {
                Some(reason) => format!("{message} [{reason}]"),
                None => message.to_string(),
            }
        }
        Some(serde_json::Value::String(code)) => value
            .get("error_description")
            .and_then(|d| d.as_str())
            .map(|desc| format!("{code}: {desc}"))
            .unwrap_or_else(|| code.clone()),
        _ => body.trim().to_string(),
    }
}
