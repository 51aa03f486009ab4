//! # parley
//!
//! Conversational chatbot binary: wires settings, telemetry, the generation
//! backend and the session registry, then runs the HTTP server or the REPL.

#![deny(unsafe_code)]

mod repl;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use parley_core::ids::SessionId;
use parley_engine::sessions::start_cleanup_task;
use parley_engine::{ChatService, SessionRegistry};
use parley_llm::{HttpGenerator, HttpGeneratorConfig, RetryConfig, RetryingGenerator};
use parley_server::ServerConfig;
use parley_settings::{LogFormat, ParleySettings};
use parley_telemetry::{init_telemetry, OutputFormat, TelemetryConfig};

/// Conversational chatbot over a hosted text-generation model.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Settings file (defaults to `~/.parley/settings.json`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API and web UI (the default).
    Serve {
        /// Host to bind (overrides settings).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind, 0 for auto-assign (overrides settings).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Chat in the terminal.
    Repl {
        /// Conversation id; a fresh one is generated if omitted.
        #[arg(long)]
        session: Option<String>,
    },
}

fn load_settings(cli: &Cli) -> Result<ParleySettings> {
    match &cli.config {
        Some(path) => parley_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => parley_settings::load_settings().context("Failed to load settings"),
    }
}

fn telemetry_config(settings: &ParleySettings, interactive: bool) -> TelemetryConfig {
    let format = match settings.logging.format {
        LogFormat::Pretty => OutputFormat::Pretty,
        LogFormat::Json => OutputFormat::Json,
    };
    let config = TelemetryConfig::from_level_name(&settings.logging.level, format);
    if interactive {
        // Per-exchange info lines would interleave with the conversation.
        config.with_module_level("parley_engine", tracing::Level::WARN)
    } else {
        config
    }
}

fn build_generator(settings: &ParleySettings) -> Result<RetryingGenerator<HttpGenerator>> {
    let model = &settings.model;
    let http = HttpGenerator::new(HttpGeneratorConfig {
        base_url: model.base_url.clone(),
        model: model.model.clone(),
        api_token: model.api_token.clone().map(Into::into),
        max_input_tokens: model.max_input_tokens,
        max_new_tokens: model.max_new_tokens,
        truncation_side: model.truncation_side,
        request_timeout: Duration::from_millis(model.request_timeout_ms),
        wait_for_model: model.wait_for_model,
    })
    .context("Failed to build generation client")?;

    if model.api_token.is_none() {
        tracing::warn!("no API token configured; the inference endpoint may reject requests");
    }

    let retry = RetryConfig {
        max_retries: settings.retry.max_retries,
        base_delay: Duration::from_millis(settings.retry.base_delay_ms),
        max_delay: Duration::from_millis(settings.retry.max_delay_ms),
    };
    Ok(RetryingGenerator::new(http, retry))
}

fn build_chat_service(settings: &ParleySettings) -> Result<Arc<ChatService>> {
    let generator = build_generator(settings)?;
    let sessions = SessionRegistry::new(settings.context.window, settings.server.max_sessions)
        .context("Invalid context window")?;
    Ok(Arc::new(ChatService::new(Arc::new(generator), Arc::new(sessions))))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli)?;
    let command = cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    });

    let interactive = matches!(command, Command::Repl { .. });
    init_telemetry(&telemetry_config(&settings, interactive))?;

    if let Command::Serve { host, port } = &command {
        if let Some(host) = host {
            settings.server.host = host.clone();
        }
        if let Some(port) = port {
            settings.server.port = *port;
        }
    }

    let chat = build_chat_service(&settings)?;

    tracing::info!(
        model = %settings.model.model,
        window = settings.context.window,
        max_sessions = settings.server.max_sessions,
        "parley starting"
    );

    match command {
        Command::Serve { .. } => serve(&settings, chat).await,
        Command::Repl { session } => {
            // One conversation for the life of the process; nothing is evicted.
            let session_id = session.map(SessionId::from_raw).unwrap_or_default();
            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            repl::run(&chat, &session_id, stdin, &mut stdout)
                .await
                .context("Terminal I/O failed")
        }
    }
}

async fn serve(settings: &ParleySettings, chat: Arc<ChatService>) -> Result<()> {
    let cleanup = start_cleanup_task(
        Arc::clone(chat.sessions()),
        Duration::from_secs(settings.server.cleanup_interval_secs.max(1)),
        Duration::from_secs(settings.server.session_idle_timeout_secs),
    );

    let config = ServerConfig {
        host: settings.server.host.clone(),
        port: settings.server.port,
        body_limit_bytes: settings.server.body_limit_bytes,
    };
    let handle = parley_server::start(config, chat)
        .await
        .context("Failed to start server")?;

    tracing::info!(port = handle.port, "parley server ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    handle.shutdown().await;
    cleanup.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_to_serve() {
        let cli = Cli::parse_from(["parley"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn cli_parses_serve_overrides() {
        let cli = Cli::parse_from(["parley", "--config", "/tmp/s.json", "serve", "--port", "8080"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.json")));
        match cli.command {
            Some(Command::Serve { host, port }) => {
                assert!(host.is_none());
                assert_eq!(port, Some(8080));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_repl_session() {
        let cli = Cli::parse_from(["parley", "repl", "--session", "mine"]);
        match cli.command {
            Some(Command::Repl { session }) => assert_eq!(session.as_deref(), Some("mine")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["parley", "repl", "--config", "x.json"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.json")));
    }

    #[test]
    fn interactive_mode_quiets_engine_logs() {
        let settings = ParleySettings::default();
        assert_eq!(telemetry_config(&settings, false).filter_directive(), "info");
        assert_eq!(
            telemetry_config(&settings, true).filter_directive(),
            "info,parley_engine=warn"
        );
    }

    #[test]
    fn builds_service_from_default_settings() {
        let chat = build_chat_service(&ParleySettings::default()).unwrap();
        assert_eq!(chat.sessions().window(), 12);
        assert_eq!(chat.generator().model(), "facebook/blenderbot-400M-distill");
    }
}
