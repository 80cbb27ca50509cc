//! First-run interactive setup wizard.
//!
//! Steps:
//! 1. Display banner
//! 2. Listen address
//! 3. Interpreter (heuristic or model) and model credentials
//! 4. Shell limits
//! 5. Write commandeer.toml

use crate::config::{self, CommandeerConfig, InterpreterKind};
use anyhow::{bail, Result};
use std::io::{BufRead, Write};
use std::path::Path;

/// ASCII banner displayed during setup.
const BANNER: &str = r#"
   ___                                          _
  / __|___ _ __  _ __  __ _ _ _  __| |___ ___ _ _
 | (__/ _ \ '  \| '  \/ _` | ' \/ _` / -_) -_) '_|
  \___\___/_|_|_|_|_|_\__,_|_||_\__,_\___\___|_|

        natural-language command orchestration
"#;

/// Run the interactive setup wizard and write the config to `config_path`.
pub fn run_setup_wizard(
    config_path: &Path,
    reader: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<CommandeerConfig> {
    writeln!(out, "{}", BANNER)?;
    writeln!(out, "Welcome to commandeer setup.\n")?;

    let defaults = CommandeerConfig::default();

    // Step 1: Server
    writeln!(out, "[1/4] Server")?;
    let listen_addr = prompt_with_default(reader, out, "  Listen address", &defaults.listen_addr)?;
    if listen_addr.parse::<std::net::SocketAddr>().is_err() {
        bail!("Invalid listen address: {}", listen_addr);
    }

    // Step 2: Interpreter
    writeln!(out, "\n[2/4] Interpreter")?;
    let kind = prompt_with_default(
        reader,
        out,
        "  Decision source (heuristic/model)",
        "heuristic",
    )?;
    let interpreter = match kind.to_lowercase().as_str() {
        "heuristic" => InterpreterKind::Heuristic,
        "model" => InterpreterKind::Model,
        other => bail!("Unknown decision source: {}", other),
    };

    let mut model_api_url = defaults.model_api_url.clone();
    let mut model_api_key = String::new();
    let mut model_name = defaults.model_name.clone();
    if interpreter == InterpreterKind::Model {
        model_api_url = prompt_with_default(reader, out, "  Model API URL", &model_api_url)?;
        model_api_key = prompt(reader, out, "  Model API key")?;
        model_name = prompt_with_default(reader, out, "  Model name", &model_name)?;
        if model_api_key.is_empty() {
            writeln!(out, "  No API key given; the heuristic will be used until one is set.")?;
        }
    }

    // Step 3: Shell limits
    writeln!(out, "\n[3/4] Shell")?;
    let default_timeout = prompt_number(
        reader,
        out,
        "  Default command timeout (seconds)",
        defaults.shell_default_timeout_secs,
    )?;
    let max_concurrent = prompt_number(
        reader,
        out,
        "  Max concurrent commands",
        defaults.max_concurrent_invocations as u64,
    )?;

    // Step 4: Write config
    writeln!(out, "\n[4/4] Writing configuration...")?;
    let config = CommandeerConfig {
        listen_addr,
        interpreter,
        model_api_url,
        model_api_key,
        model_name,
        shell_default_timeout_secs: default_timeout,
        shell_max_timeout_secs: defaults.shell_max_timeout_secs.max(default_timeout),
        max_concurrent_invocations: max_concurrent as usize,
        ..defaults
    };
    config::save_config(&config, config_path)?;
    writeln!(out, "  Written: {}", config_path.display())?;

    writeln!(out, "\nSetup complete! Run `commandeer serve` to start.\n")?;
    Ok(config)
}

/// Prompt the user for input with a label.
fn prompt(reader: &mut impl BufRead, out: &mut impl Write, label: &str) -> Result<String> {
    write!(out, "{}: ", label)?;
    out.flush()?;
    let mut input = String::new();
    reader.read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Prompt with a default value.
fn prompt_with_default(
    reader: &mut impl BufRead,
    out: &mut impl Write,
    label: &str,
    default: &str,
) -> Result<String> {
    write!(out, "{} [{}]: ", label, default)?;
    out.flush()?;
    let mut input = String::new();
    reader.read_line(&mut input)?;
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

/// Prompt for a positive integer with a default.
fn prompt_number(
    reader: &mut impl BufRead,
    out: &mut impl Write,
    label: &str,
    default: u64,
) -> Result<u64> {
    let raw = prompt_with_default(reader, out, label, &default.to_string())?;
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => bail!("{} must be a positive integer, got '{}'", label.trim(), raw),
    }
}
