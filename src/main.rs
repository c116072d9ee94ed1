//! CLI entry point for codebeat.

mod cli;

use anyhow::Context;
use clap::Parser;
use codebeat::build_info::startup_metadata_line;
use codebeat::config::{load_config, load_credentials};
use codebeat::factory::build_clients;
use codebeat::repl::{run_interactive, run_once};
use codebeat::ui::{RenderSink, Renderer};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    // A missing .env file is normal; variables may come from the shell.
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            tracing::warn!(error = %err, "failed to read .env file");
        }
    }

    let args = cli::Args::parse();
    match run(args).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

async fn run(args: cli::Args) -> anyhow::Result<i32> {
    let mut config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(1);
        }
    };

    if let Some(model) = &args.model {
        config.conversation.model = model.clone();
    }
    if let Some(url) = &args.base_url {
        config.conversation.base_url = url.clone();
    }
    if args.no_color {
        config.display.color = false;
    }

    let renderer = Renderer::new(config.display.color, config.display.spinner);

    // Fatal before any network traffic when the conversation key is absent.
    let loaded = match load_credentials(args.mode, |name| std::env::var(name).ok()) {
        Ok(loaded) => loaded,
        Err(err) => {
            renderer.error(&err.to_string());
            return Ok(1);
        }
    };

    renderer.banner(
        "Welcome to codebeat!",
        &format!(
            "{} · {} · {} mode · {}",
            config.conversation.label,
            config.conversation.model,
            args.mode.name(),
            startup_metadata_line()
        ),
    );
    for warning in &loaded.warnings {
        renderer.warn(warning);
    }

    let assistant = build_clients(args.mode, &config, &loaded.credentials, &renderer)
        .await
        .into_assistant(args.mode, &config.system_prompt)
        .with_temperature(config.temperature);

    if let Some(message) = args.one_shot_message() {
        let ok = run_once(&assistant, &message, &renderer).await;
        return Ok(if ok { 0 } else { 1 });
    }

    renderer.info("Type 'exit' to quit the chat");
    let stdin = BufReader::new(tokio::io::stdin());
    let turns = run_interactive(&assistant, stdin, &renderer)
        .await
        .context("reading standard input")?;
    tracing::debug!(turns, "session finished");
    Ok(0)
}
