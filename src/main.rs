//! Commandeer: natural-language command orchestration service.
//!
//! Usage:
//!   commandeer serve            Start the HTTP server
//!   commandeer exec <TEXT...>   Interpret and run one instruction
//!   commandeer tools            List registered tools
//!   commandeer init             Run the setup wizard

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use commandeer::config::{self, CommandeerConfig};
use commandeer::server;
use commandeer::types::{ResponseEnvelope, ToolResult};
use commandeer::Orchestrator;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "commandeer")]
#[command(version)]
#[command(about = "Turn natural-language instructions into local tool calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file [default: ~/.commandeer/commandeer.toml].
    #[arg(long)]
    config: Option<String>,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Address to bind, overriding the config file.
        #[arg(long)]
        listen: Option<String>,
    },

    /// Interpret and execute a single instruction.
    Exec {
        /// The instruction, e.g. "list files".
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Print the raw JSON envelope.
        #[arg(long)]
        json: bool,
    },

    /// List registered tools.
    Tools,

    /// Run the first-time setup wizard.
    Init,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .as_deref()
        .map(config::expand_path)
        .unwrap_or_else(config::default_config_path);

    // `init` must work even when the existing config is unreadable.
    let cfg = match cli.command {
        Commands::Init => CommandeerConfig::default(),
        _ => config::load_config(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?,
    };
    init_logging(cli.log_level.as_deref().unwrap_or(&cfg.log_level));

    match cli.command {
        Commands::Serve { listen } => cmd_serve(cfg, listen).await?,
        Commands::Exec { text, json } => {
            let envelope = cmd_exec(&cfg, &text.join(" "), json).await?;
            if !envelope.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Tools => cmd_tools(&cfg)?,
        Commands::Init => cmd_init(&config_path)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_init(config_path: &Path) -> Result<()> {
    let stdin = std::io::stdin();
    let mut reader = stdin.lock();
    let mut out = std::io::stdout();
    commandeer::setup::run_setup_wizard(config_path, &mut reader, &mut out)?;
    Ok(())
}

async fn cmd_serve(cfg: CommandeerConfig, listen: Option<String>) -> Result<()> {
    let listen = listen.unwrap_or_else(|| cfg.listen_addr.clone());
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", listen))?;
    if !addr.ip().is_loopback() {
        warn!(
            "Listening on non-loopback address {}; anyone who can reach it can run commands",
            addr
        );
    }

    let orchestrator = Arc::new(Orchestrator::from_config(&cfg)?);

    println!(
        "{} Serving on http://{} (interpreter: {}, configured: {})",
        ">>>".green().bold(),
        addr,
        orchestrator.interpreter().source_name(),
        cfg.interpreter,
    );

    let cancel = CancellationToken::new();
    let server_cancel = cancel.clone();
    let mut server_handle =
        tokio::spawn(async move { server::serve(orchestrator, addr, server_cancel).await });

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for Ctrl+C")?;
            println!("\n{} Shutting down gracefully...", "<<<".red().bold());
            cancel.cancel();
            server_handle.await.context("Server task panicked")??;
        }
        res = &mut server_handle => {
            res.context("Server task panicked")??;
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Run one instruction and print its envelope. The caller maps `success` to the exit code.
async fn cmd_exec(cfg: &CommandeerConfig, text: &str, json: bool) -> Result<ResponseEnvelope> {
    let orchestrator = Orchestrator::from_config(cfg)?;
    let envelope = orchestrator.execute(text).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        print_envelope(&envelope);
    }
    Ok(envelope)
}

fn cmd_tools(cfg: &CommandeerConfig) -> Result<()> {
    let orchestrator = Orchestrator::from_config(cfg)?;

    println!();
    println!("{}", "=== Registered Tools ===".bold());
    for tool in orchestrator.tools() {
        println!();
        println!("  {}: {}", tool.name.bold(), tool.description);
        println!(
            "    Parameters: {}",
            serde_json::to_string(&tool.parameters)?.dimmed()
        );
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_envelope(envelope: &ResponseEnvelope) {
    if let Some(interp) = &envelope.interpretation {
        println!(
            "{} {} {}",
            "Interpretation:".bold(),
            interp.tool_id.cyan(),
            serde_json::Value::Object(interp.parameters.clone())
        );
        println!("  {}", interp.explanation.dimmed());
    }

    if let Some(error) = &envelope.error {
        println!("{} {}", "Error:".red().bold(), error);
        return;
    }

    match &envelope.result {
        Some(ToolResult::Success {
            stdout,
            stderr,
            return_code,
            ..
        }) => {
            let code = if *return_code == 0 {
                return_code.to_string().green()
            } else {
                return_code.to_string().yellow()
            };
            println!("{} exit code {}", "Result:".bold(), code);
            if !stdout.is_empty() {
                print!("{}", stdout);
            }
            if !stderr.is_empty() {
                eprint!("{}", stderr.red());
            }
        }
        Some(ToolResult::Failure { error_message, .. }) => {
            println!("{} {}", "Failed:".red().bold(), error_message);
        }
        None => {}
    }
}
