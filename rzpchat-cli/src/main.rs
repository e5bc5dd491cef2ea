// rzpchat-cli/src/main.rs
mod models;
mod rendering;
mod surfaces;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use rzpchat_core::{
    classify,
    config::{find_config_file, CONFIG_FILENAME},
    docs::DocsSearch,
    AssistConfig, Assistant, DocsClient, McpClient, Route,
};

use crate::models::cli::{Cli, Commands};
use crate::rendering::print_formatted;
use crate::surfaces::{terminal_spinner, Revealed, SurfaceKind, SurfaceRegistry};

const APP_DIR: &str = "rzpchat";
const LOG_FILE_NAME: &str = "rzpchat.log";
const HISTORY_FILE_NAME: &str = "cli_history.txt";

/// Loads the explicit config file, the nearest `Rzpchat.toml`, or defaults.
fn load_cli_config(explicit: Option<&Path>) -> Result<AssistConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let current_dir = env::current_dir().context("Failed to get current directory")?;
            find_config_file(&current_dir)
        }
    };
    match path {
        Some(path) => {
            info!("Using configuration file at: {:?}", path);
            AssistConfig::from_file(&path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))
        }
        None => {
            info!("No {} found; using built-in defaults.", CONFIG_FILENAME);
            Ok(AssistConfig::default())
        }
    }
}

fn build_assistant(config: &AssistConfig) -> Result<Assistant> {
    let mcp = McpClient::from_config(config).context("Failed to create MCP client")?;
    info!(endpoint = mcp.endpoint(), "Razorpay MCP endpoint configured.");
    let docs: Option<Arc<dyn DocsSearch>> = DocsClient::from_config(config)
        .context("Failed to create docs client")?
        .map(|client| Arc::new(client) as Arc<dyn DocsSearch>);
    Ok(Assistant::new(Arc::new(mcp), docs))
}

fn app_dir() -> Option<PathBuf> {
    dirs::cache_dir()
        .or_else(dirs::runtime_dir)
        .or_else(|| Some(env::temp_dir()))
        .map(|d| d.join(APP_DIR))
}

fn print_reply(reply: &str, plain: bool) {
    if let Err(e) = print_formatted(reply, plain) {
        error!("Failed to render reply markdown: {}. Printing raw.", e);
        println!("{}", reply);
    }
}

fn print_welcome_message(registry: &SurfaceRegistry, has_docs: bool) {
    println!("\n{}", "rzpchat - Razorpay assistant".cyan().bold());
    let active = registry.active_kind();
    println!("{}: {} ({})", "Surface".cyan(), active.name(), active.description());
    if !has_docs {
        println!("{}", "Docs search is off; set docs.endpoint to enable it.".dimmed());
    }
    println!(
        "{}\n{}",
        "Switch surfaces with :tools, :docs or :auto. Type 'help' to list tools.".dimmed(),
        "Type 'exit', 'quit' or Ctrl-D to quit.".dimmed()
    );
    println!();
}

/// Answers one message on the active surface, showing its busy indicator meanwhile.
async fn answer(assistant: &Assistant, registry: &mut SurfaceRegistry, text: &str, plain: bool) {
    let route = registry.active_kind().route();
    let label = match assistant.resolve_route(text, route) {
        Route::Docs => "Searching the docs...",
        _ => "Talking to Razorpay...",
    };
    if !registry.begin_busy(label) {
        warn!("Busy indicator already active on this surface.");
    }
    let reply = assistant.respond(text, route).await;
    registry.end_busy();
    println!();
    print_reply(&reply, plain);
}

/// Handles `:`-prefixed session commands. Returns `false` for ordinary messages.
async fn handle_session_command(input: &str, assistant: &Assistant, registry: &mut SurfaceRegistry) -> bool {
    if let Some(kind) = SurfaceKind::from_switch(input) {
        let verb = match registry.reveal(kind) {
            Revealed::Created => "Opened",
            Revealed::Existing => "Switched to",
        };
        println!("{} {} surface: {}", verb.cyan(), kind.name().bold(), kind.description());
        if kind == SurfaceKind::Docs && !assistant.has_docs() {
            println!("{}", "Docs search is not configured; messages here will explain how to enable it.".yellow());
        }
        return true;
    }
    match input.trim() {
        ":surfaces" => {
            for surface in registry.open() {
                let marker = if surface.kind() == registry.active_kind() { "*" } else { " " };
                println!("{} {:<6} {} message(s)", marker, surface.kind().name(), surface.messages());
            }
            true
        }
        ":reset" => {
            assistant.reset_docs().await;
            println!("{}", "Docs conversation history cleared.".cyan());
            true
        }
        _ => false,
    }
}

async fn run_interactive(assistant: Assistant, initial: SurfaceKind, plain: bool) -> Result<()> {
    let mut registry = SurfaceRegistry::new(initial, terminal_spinner);
    print_welcome_message(&registry, assistant.has_docs());

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl = DefaultEditor::with_config(rl_config)?;

    let history_dir = app_dir().ok_or_else(|| anyhow!("Could not determine cache directory for history file"))?;
    fs::create_dir_all(&history_dir).context("Failed to create history directory")?;
    let history_file_path = history_dir.join(HISTORY_FILE_NAME);
    if rl.load_history(&history_file_path).is_err() {
        debug!(path = %history_file_path.display(), "No previous CLI history found or error loading.");
    }

    loop {
        let prompt = format!("{} {} ", registry.active_kind().name().dimmed(), ">".green().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
                    info!("Exit command entered, leaving interactive mode.");
                    break;
                }
                if handle_session_command(input, &assistant, &mut registry).await {
                    continue;
                }
                answer(&assistant, &mut registry, input, plain).await;
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                info!("EOF detected, exiting interactive mode.");
                break;
            }
            Err(err) => {
                error!("Readline error: {:?}", err);
                eprintln!("Error reading input: {}", err.to_string().red());
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history_file_path) {
        warn!(path = %history_file_path.display(), error = %e, "Failed to save CLI history.");
    } else {
        debug!(path = %history_file_path.display(), "Saved CLI history.");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    colored::control::set_override(true);
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // --- Logging Setup ---
    let default_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let Some(log_dir) = app_dir() else {
        eprintln!("{}", "Error: Could not determine a suitable directory for log files.".red());
        return ExitCode::FAILURE;
    };
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("{} Failed to create log directory {}: {}", "Error:".red(), log_dir.display(), e);
        return ExitCode::FAILURE;
    }
    let log_path = log_dir.join(LOG_FILE_NAME);
    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let time_format = match time::format_description::parse(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
    ) {
        Ok(desc) => desc,
        Err(e) => {
            eprintln!("{} Failed to parse log time format: {}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };
    let local_timer = LocalTime::new(time_format);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(local_timer.clone());
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(local_timer)
        .with_target(false)
        .with_level(true);

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("{} Failed to initialize logging: {}", "Error:".red(), e);
        return ExitCode::FAILURE;
    }
    colored::control::unset_override();

    info!(
        "Logging initialized (default level: {}). Logging to stderr and {}",
        default_level,
        log_path.display()
    );
    // --- End Logging Setup ---

    // Classification needs no configuration or network.
    if let Some(Commands::Classify { text }) = &cli.command {
        let request = classify(&text.join(" "));
        return match serde_json::to_string_pretty(&request) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{} {}", "Error:".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    let assistant = match load_cli_config(cli.config.as_deref()).and_then(|config| build_assistant(&config)) {
        Ok(assistant) => assistant,
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            eprintln!("{} {:#}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Some(Commands::Ask { text }) => {
            print_reply(&assistant.respond(&text.join(" "), Route::Tools).await, cli.plain);
            Ok(())
        }
        Some(Commands::Docs { question }) => {
            print_reply(&assistant.ask_docs(&question.join(" ")).await, cli.plain);
            Ok(())
        }
        Some(Commands::Tools) => {
            print_reply(&assistant.list_tools().await, cli.plain);
            Ok(())
        }
        Some(Commands::Classify { .. }) => Ok(()),
        None => run_interactive(assistant, cli.surface.into(), cli.plain).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Operation failed: {}", e);
            eprintln!("{} Operation failed: {}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}
