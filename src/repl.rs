//! Message loop: one-shot from process arguments, or interactive over any
//! line-oriented reader.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::assistant::{Assistant, TurnOutput};
use crate::ui::RenderSink;

/// `exit` or `quit`, in any case, ends an interactive session.
pub fn is_exit_command(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit")
}

/// Render every output of one turn.
pub fn render_outputs(outputs: &[TurnOutput], sink: &dyn RenderSink) {
    for output in outputs {
        match output {
            TurnOutput::Reply { label, text } => sink.reply(label, text),
            TurnOutput::Failed { message, .. } => sink.error(message),
        }
    }
}

/// Process a single message. Returns `false` if any provider failed.
pub async fn run_once(assistant: &Assistant, message: &str, sink: &dyn RenderSink) -> bool {
    let outputs = assistant.respond(message, sink).await;
    render_outputs(&outputs, sink);
    !outputs.iter().any(TurnOutput::is_failure)
}

/// Read lines until an exit keyword or end of input; returns the number of
/// turns processed. A failed turn is rendered and the loop carries on.
pub async fn run_interactive<R>(
    assistant: &Assistant,
    input: R,
    sink: &dyn RenderSink,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut turns = 0;
    loop {
        sink.prompt();
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        if is_exit_command(&line) {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        let outputs = assistant.respond(message, sink).await;
        render_outputs(&outputs, sink);
        turns += 1;
    }
    sink.goodbye();
    Ok(turns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::Provider;
    use crate::config::RunMode;
    use crate::error::ApiError;
    use crate::testsupport::{RecordingSink, ScriptedModel};
    use crate::types::{ChatResponse, Message};
    use std::sync::Arc;

    fn assistant(model: Arc<ScriptedModel>) -> Assistant {
        Assistant::new(RunMode::Chat, Provider::new("Reka AI", "m", model), "sys")
    }

    fn text(content: &str) -> Result<ChatResponse, ApiError> {
        Ok(ChatResponse::from_message(Message::assistant(content)))
    }

    #[test]
    fn exit_keywords_ignore_case_and_whitespace() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("  QUIT "));
        assert!(is_exit_command("Exit"));
        assert!(!is_exit_command("exit now"));
        assert!(!is_exit_command(""));
    }

    #[tokio::test]
    async fn loop_continues_after_failed_turn() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(ApiError::status(503, "overloaded".into(), None)),
            text("second answer"),
        ]));
        let sink = RecordingSink::default();
        let input: &[u8] = b"first\nsecond\n";
        let turns = run_interactive(&assistant(model.clone()), input, &sink)
            .await
            .unwrap();
        assert_eq!(turns, 2);
        let events = sink.events();
        assert!(events.contains(&"error:status 503: overloaded".to_string()));
        assert!(events.contains(&"reply:Reka AI:second answer".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("goodbye"));
    }

    #[tokio::test]
    async fn exit_stops_before_later_lines() {
        let model = Arc::new(ScriptedModel::new(vec![text("one")]));
        let sink = RecordingSink::default();
        let input: &[u8] = b"hello\n\n   \nQuit\nnever sent\n";
        let turns = run_interactive(&assistant(model.clone()), input, &sink)
            .await
            .unwrap();
        assert_eq!(turns, 1);
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn one_shot_reports_failure() {
        let model = Arc::new(ScriptedModel::new(vec![Err(ApiError::InvalidResponse(
            "garbled".into(),
        ))]));
        let sink = RecordingSink::default();
        assert!(!run_once(&assistant(model), "hi", &sink).await);
        assert_eq!(sink.events(), vec!["error:invalid response: garbled".to_string()]);
    }
}
