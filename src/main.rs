use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{info, warn};

mod api;
mod app;
mod config;
mod handler;
mod input;
mod logging;
mod state;
mod tui;
mod ui;

use api::BackendClient;
use app::App;
use config::Config;
use logging::LogTarget;
use state::{Action, ClientState, Effect, SelectedFile, EMPTY_SUBMISSION};
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "autou-triage")]
#[command(version, about = "Classify emails and chat with the AutoU assistant")]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "AUTOU_API_URL", global = true)]
    api_url: Option<String>,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one email and print the category and suggested reply
    Classify {
        /// Email text
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,
        /// A .txt or .pdf file to upload instead of text
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Check that the backend is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_target = match cli.command {
        // The terminal UI owns the screen
        None => logging::default_log_path().map(LogTarget::File),
        Some(_) => Some(LogTarget::Stderr),
    };
    if let Some(target) = log_target {
        if let Err(e) = logging::init(target, "info") {
            eprintln!("{} {}", "warning:".yellow(), e);
        }
    }

    let config_path = cli.config.clone().or_else(|| Config::default_path().ok());
    let config = match &config_path {
        Some(path) => Config::load_from(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "could not read config, using defaults");
            Config::default()
        }),
        None => Config::default(),
    };

    let api_url = config.resolve_api_url(cli.api_url.as_deref());
    let backend = BackendClient::new(&api_url);
    info!(api_url = %backend.base_url(), "backend configured");

    match cli.command {
        None => run_tui(backend, config, config_path).await,
        Some(Commands::Classify { text, file }) => classify_once(&backend, text, file).await,
        Some(Commands::Health) => check_health(&backend).await,
    }
}

async fn run_tui(backend: BackendClient, config: Config, config_path: Option<PathBuf>) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let mut app = App::new(backend, config, config_path, events.sender());

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event);
    }

    info!("exiting");
    Ok(())
}

/// Goes through the same transitions as the terminal UI so validation matches.
async fn classify_once(backend: &BackendClient, text: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let mut state = ClientState::new();

    if let Some(path) = file {
        let file = SelectedFile::from_path(path)?;
        state.apply(Action::SelectFile(file));
    } else if let Some(text) = text {
        state.apply(Action::EditText(text));
    }

    let Some(Effect::Classify { request, .. }) = state.apply(Action::SubmitClassification) else {
        let message = state
            .notice()
            .map(|notice| notice.text.clone())
            .unwrap_or_else(|| EMPTY_SUBMISSION.to_string());
        bail!(message);
    };

    println!("{}", "⏳ Classificando...".dimmed());
    let result = backend.classify(&request).await?;

    let category = if result.is_productive() {
        format!("✅ {}", result.category_label()).green().bold()
    } else {
        format!("ℹ️ {}", result.category_label()).blue().bold()
    };
    println!("\n{} {}", "Categoria:".bold(), category);
    println!("\n{}", "Resposta sugerida:".bold());
    println!("{}", result.reply_text());

    Ok(())
}

async fn check_health(backend: &BackendClient) -> Result<()> {
    let status = backend.health().await?;
    println!("{} {} ({})", "✓".green(), status.bold(), backend.base_url().dimmed());
    Ok(())
}
