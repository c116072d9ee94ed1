//! Turn handler: one user line in, one labelled reply (per provider) out.
//!
//! A turn never makes more than two model requests. In `tools` mode the
//! first tool call of the first response is executed, its result is appended,
//! and the conversation is re-sent without tools; whatever comes back is
//! final even if it asks for another tool.

use std::fmt;
use std::sync::Arc;

use crate::api::ModelClient;
use crate::config::{RunMode, GITHUB_TOKEN_VAR};
use crate::error::TurnError;
use crate::intent::{self, Directive};
use crate::tools::{self, github, ToolExecutor};
use crate::types::{ChatRequest, Message, ToolDefinition};
use crate::ui::RenderSink;

/// One conversation provider: display label, model id and client.
#[derive(Clone)]
pub struct Provider {
    pub label: String,
    pub model: String,
    pub client: Arc<dyn ModelClient>,
}

impl Provider {
    pub fn new(label: impl Into<String>, model: impl Into<String>, client: Arc<dyn ModelClient>) -> Self {
        Self {
            label: label.into(),
            model: model.into(),
            client,
        }
    }
}

/// What one provider produced for a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutput {
    Reply { label: String, text: String },
    Failed { label: String, message: String },
}

impl TurnOutput {
    pub fn label(&self) -> &str {
        match self {
            Self::Reply { label, .. } | Self::Failed { label, .. } => label,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    fn from_result(label: &str, result: Result<String, TurnError>) -> Self {
        match result {
            Ok(text) => Self::Reply {
                label: label.to_string(),
                text,
            },
            Err(err) => {
                tracing::warn!(provider = label, error = %err, "turn failed");
                Self::Failed {
                    label: label.to_string(),
                    message: err.to_string(),
                }
            }
        }
    }
}

impl fmt::Display for TurnOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reply { text, .. } => f.write_str(text),
            Self::Failed { message, .. } => write!(f, "Error: {message}"),
        }
    }
}

/// Per-mode turn logic over explicitly passed client handles.
pub struct Assistant {
    mode: RunMode,
    primary: Provider,
    secondary: Option<Provider>,
    tools: ToolExecutor,
    system_prompt: String,
    temperature: Option<f64>,
}

impl Assistant {
    pub fn new(mode: RunMode, primary: Provider, system_prompt: impl Into<String>) -> Self {
        Self {
            mode,
            primary,
            secondary: None,
            tools: ToolExecutor::default(),
            system_prompt: system_prompt.into(),
            temperature: None,
        }
    }

    pub fn with_tools(mut self, tools: ToolExecutor) -> Self {
        self.tools = tools;
        self
    }

    /// Sampling temperature for every request; `None` leaves the provider default.
    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Second provider for compare mode.
    pub fn with_secondary(mut self, secondary: Provider) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn primary(&self) -> &Provider {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&Provider> {
        self.secondary.as_ref()
    }

    /// Handle one user line. Failures are folded into [`TurnOutput::Failed`].
    pub async fn respond(&self, input: &str, sink: &dyn RenderSink) -> Vec<TurnOutput> {
        let label = self.primary.label.as_str();
        match self.mode {
            RunMode::Chat => {
                let _progress = sink.progress(&format!("asking {label}"));
                let result = self.plain_turn(&self.primary, input).await;
                vec![TurnOutput::from_result(label, result)]
            }
            RunMode::Lookup => {
                let content = self.with_lookup_context(input, sink).await;
                let _progress = sink.progress(&format!("asking {label}"));
                let result = self.plain_turn(&self.primary, &content).await;
                vec![TurnOutput::from_result(label, result)]
            }
            RunMode::Tools => {
                let result = self.tool_turn(input, sink).await;
                vec![TurnOutput::from_result(label, result)]
            }
            RunMode::Compare => match &self.secondary {
                Some(secondary) => {
                    let _progress =
                        sink.progress(&format!("asking {label} and {}", secondary.label));
                    let (first, second) = tokio::join!(
                        self.plain_turn(&self.primary, input),
                        self.plain_turn(secondary, input)
                    );
                    vec![
                        TurnOutput::from_result(label, first),
                        TurnOutput::from_result(&secondary.label, second),
                    ]
                }
                None => {
                    let _progress = sink.progress(&format!("asking {label}"));
                    let result = self.plain_turn(&self.primary, input).await;
                    vec![TurnOutput::from_result(label, result)]
                }
            },
        }
    }

    fn opening(&self, user_content: &str) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt.as_str()),
            Message::user(user_content),
        ]
    }

    async fn plain_turn(&self, provider: &Provider, user_content: &str) -> Result<String, TurnError> {
        let reply = send(provider, self.opening(user_content), None, self.temperature).await?;
        Ok(reply.content.unwrap_or_default())
    }

    async fn tool_turn(&self, input: &str, sink: &dyn RenderSink) -> Result<String, TurnError> {
        let provider = &self.primary;
        let mut messages = self.opening(input);

        let first = {
            let _progress = sink.progress(&format!("asking {}", provider.label));
            send(provider, messages.clone(), Some(tools::definitions()), self.temperature).await?
        };
        let Some(call) = first.first_tool_call().cloned() else {
            return Ok(first.content.unwrap_or_default());
        };
        if first.tool_calls.as_ref().is_some_and(|calls| calls.len() > 1) {
            tracing::debug!("model requested several tool calls; only the first is executed");
        }

        sink.tool_call(&call.function.name, &call.function.arguments);
        let result = self.tools.execute(&call.function).await;
        let payload = result.to_json();
        sink.tool_result(&payload);

        // Record the assistant message with only the call that was honored;
        // provider-specific fields ride along untouched.
        let mut recorded = first;
        recorded.tool_calls = Some(vec![call.clone()]);
        messages.push(recorded);
        messages.push(Message::tool_result(call.id, payload));

        let follow_up = {
            let _progress = sink.progress(&format!("asking {}", provider.label));
            send(provider, messages, None, self.temperature).await?
        };
        if follow_up.first_tool_call().is_some() {
            tracing::debug!("ignoring tool call in follow-up response");
        }
        Ok(follow_up.content.unwrap_or_default())
    }

    /// Prepend GitHub profile data (or the reason it is missing) to the
    /// user's message when the pattern layer spots a username.
    async fn with_lookup_context(&self, input: &str, sink: &dyn RenderSink) -> String {
        let username = match intent::recognize(input) {
            Directive::GithubProfile { username } => username,
            Directive::Playback(request) => {
                tracing::debug!(?request, "playback request recognized; lookup mode has no music control");
                return input.to_string();
            }
            Directive::None => return input.to_string(),
        };

        let Some(api) = self.tools.github() else {
            return format!(
                "[GitHub lookup for '{username}' unavailable: {GITHUB_TOKEN_VAR} is not set]\n\n{input}"
            );
        };
        sink.info(&format!("looking up GitHub user {username}"));
        let context = {
            let _progress = sink.progress("fetching GitHub profile");
            github::run(api, &username).await
        };
        match context {
            Ok(summary) => match serde_json::to_string_pretty(&summary) {
                Ok(json) => format!(
                    "Here is GitHub profile data for '{username}':\n{json}\n\nUser message: {input}"
                ),
                Err(e) => format!("[GitHub profile for '{username}' unreadable: {e}]\n\n{input}"),
            },
            Err(err) => format!("[GitHub lookup failed: {err}]\n\n{input}"),
        }
    }
}

async fn send(
    provider: &Provider,
    messages: Vec<Message>,
    tools: Option<Vec<ToolDefinition>>,
    temperature: Option<f64>,
) -> Result<Message, TurnError> {
    let request = ChatRequest {
        model: provider.model.clone(),
        messages,
        tools,
        temperature,
    };
    let response = provider.client.chat(&request).await?;
    if let Some(usage) = &response.usage {
        tracing::debug!(
            provider = %provider.label,
            prompt = usage.prompt_tokens,
            completion = usage.completion_tokens,
            "token usage"
        );
    }
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or(TurnError::EmptyResponse)
}
