//! `get_github_user`: public profile summary for one username.

use serde::Deserialize;

use crate::error::ServiceError;
use crate::services::{ProfileApi, ProfileSummary};
use crate::types::{FunctionDefinition, ToolDefinition};

pub const NAME: &str = "get_github_user";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(super) struct Arguments {
    pub username: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        tool_type: "function".into(),
        function: FunctionDefinition {
            name: NAME.into(),
            description: "Look up a GitHub user's public profile: name, bio, company, location, follower counts and their most recently updated repositories."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "username": {
                        "type": "string",
                        "description": "GitHub login, without a leading @"
                    }
                },
                "required": ["username"]
            }),
        },
    }
}

/// Strip decorations models like to add (`@octocat`, surrounding spaces).
pub fn normalize_username(raw: &str) -> &str {
    raw.trim().trim_start_matches('@')
}

pub async fn run(api: &dyn ProfileApi, username: &str) -> Result<ProfileSummary, ServiceError> {
    api.profile_summary(normalize_username(username)).await
}
