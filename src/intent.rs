//! Pattern layer for `lookup` mode.
//!
//! Recognition is separated from action: [`recognize`] only classifies a
//! message into a [`Directive`]; the turn handler decides what to do with it.

use regex::Regex;
use std::sync::OnceLock;

use crate::services::github::LOGIN;
use crate::tools::{PlaybackCommand, PlaybackRequest};

/// What a free-text message appears to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    GithubProfile { username: String },
    Playback(PlaybackRequest),
    None,
}

fn username_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            format!(r"@{LOGIN}"),
            format!(r"github\.com/{LOGIN}"),
            format!(r"github\s+user(?:name)?\s+{LOGIN}"),
            format!(r"user\s+{LOGIN}\s+on\s+github"),
        ]
        .iter()
        .map(|p| Regex::new(p).expect("username pattern is valid"))
        .collect()
    })
}

fn play_pattern() -> &'static Regex {
    static PLAY: OnceLock<Regex> = OnceLock::new();
    PLAY.get_or_init(|| {
        Regex::new(r"\bplay\b(?:\s+(.+?))?(?:\s+on\s+spotify)?[.!?]*$").expect("play pattern is valid")
    })
}

/// First GitHub login mentioned in `message`, trying each pattern in order.
pub fn extract_username(message: &str) -> Option<String> {
    let lowered = message.to_lowercase();
    username_patterns()
        .iter()
        .find_map(|re| re.captures(&lowered))
        .map(|caps| caps[1].to_string())
}

/// Keyword-based playback recognition. Earlier keywords win, so "what's
/// playing" is a status query rather than a play request.
pub fn extract_playback(message: &str) -> Option<PlaybackRequest> {
    let lowered = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lowered.contains(n));

    let command = if has(&["what's playing", "what is playing", "now playing", "current song"]) {
        PlaybackCommand::Current
    } else if has(&["pause"]) {
        PlaybackCommand::Pause
    } else if has(&["next song", "next track", "skip"]) {
        PlaybackCommand::Next
    } else if has(&["previous song", "previous track", "last song"]) {
        PlaybackCommand::Previous
    } else if has(&["coding music", "coding playlist", "music for coding"]) {
        PlaybackCommand::Coding
    } else if has(&["recommend"]) {
        PlaybackCommand::Recommend
    } else if let Some(caps) = play_pattern().captures(&lowered) {
        let request = PlaybackRequest::new(PlaybackCommand::Play);
        return Some(match caps.get(1).map(|m| m.as_str().trim()) {
            Some(query) if !query.is_empty() && query != "music" => request.with_query(query),
            _ => request,
        });
    } else {
        return None;
    };
    Some(PlaybackRequest::new(command))
}

/// Classify a message. GitHub mentions take precedence over playback keywords.
pub fn recognize(message: &str) -> Directive {
    if let Some(username) = extract_username(message) {
        return Directive::GithubProfile { username };
    }
    extract_playback(message).map_or(Directive::None, Directive::Playback)
}
