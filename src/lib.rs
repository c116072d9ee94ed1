//! codebeat: a terminal chat client for OpenAI-compatible APIs with GitHub
//! profile lookups and Spotify playback control.
//!
//! The binary is a thin shell around this library: configuration and
//! credentials come from [`config`], [`factory`] builds the client handles,
//! [`assistant`] runs one turn per user line and [`repl`] drives the loop.
//!
//! ```no_run
//! use codebeat::config::{load_config, load_credentials, RunMode};
//! use codebeat::factory::build_clients;
//! use codebeat::ui::Renderer;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = load_config(None)?;
//! let loaded = load_credentials(RunMode::Chat, |name| std::env::var(name).ok())?;
//! let renderer = Renderer::new(true, true);
//! let assistant = build_clients(RunMode::Chat, &config, &loaded.credentials, &renderer)
//!     .await
//!     .into_assistant(RunMode::Chat, &config.system_prompt);
//! codebeat::repl::run_once(&assistant, "Hello!", &renderer).await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod assistant;
pub mod build_info;
pub mod config;
pub mod error;
pub mod factory;
pub mod intent;
pub mod repl;
pub mod services;
#[cfg(test)]
pub mod testsupport;
pub mod tools;
pub mod types;
pub mod ui;
