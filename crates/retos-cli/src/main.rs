//! retos - command-line client for the retos platform.
//!
//! Register an account, sign in with Google or email/password, and view
//! the profile and ranking. The session token persists between runs.

mod commands;
mod prompt;

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use retos_core::{App, Config};

use commands::Command;

const USAGE: &str = "\
Usage: retos <command> [args]

Commands:
  status                       Show the current session
  register                     Create an account (prompts for the form)
  google <credential>          Sign in with a Google ID token
  login [correo]               Sign in with email and password
  profile                      Show your profile
  ranking [page] [per_page]    Show the leaderboard
  open <path>                  Resolve a navigation path (/register, /profile, ...)
  logout                       End the session
  personas [page] [per_page]   List registered personas
  delete <id>...               Remove personas by id
";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    if command == Command::Help {
        print!("{}", USAGE);
        return Ok(());
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let mut app = App::new(config)?;
    let session = app.start();
    info!(authenticated = session.is_authenticated(), "retos starting");

    commands::run(&mut app, command).await
}
