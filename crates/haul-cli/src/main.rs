//! `haul`: command-line client for the marketplace session layer.
//!
//! # Usage
//!
//! ```text
//! haul login --email fish@demo.com
//! haul status
//! haul profile
//! haul logout
//! ```
//!
//! Every invocation restores the persisted session before acting, exactly as
//! a graphical client would before mounting its first view.

mod app;
mod client;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use app::{Action, App};
use clap::{Parser, Subcommand};
use client::ApiClient;
use haul_store_sqlite::SqliteSessionStore;
use settings::{CliConfig, expand_tilde};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "haul", version, about = "Session client for the Haul marketplace")]
struct Args {
  /// Path to a TOML config file (base_url, store_path, timeout_secs).
  #[arg(short, long, value_name = "FILE", default_value = "haul.toml")]
  config: PathBuf,

  /// Base URL of the marketplace API. Overrides the config file.
  #[arg(long, env = "HAUL_URL")]
  url: Option<String>,

  /// Session database path. Overrides the config file.
  #[arg(long, env = "HAUL_STORE", value_name = "FILE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Sign in and persist the session.
  Login {
    #[arg(long)]
    email: String,

    /// Read from stdin when omitted.
    #[arg(long, env = "HAUL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },
  /// Sign out and forget the persisted session.
  Logout,
  /// Show the restored session and the view it selects.
  Status,
  /// Print the signed-in user's profile as JSON.
  Profile,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  // CLI flags override the config file, which overrides defaults.
  let mut cfg = CliConfig::load(&args.config)?;
  if let Some(url) = args.url {
    cfg.base_url = url;
  }
  if let Some(store) = args.store {
    cfg.store_path = store;
  }

  let action = match args.command {
    Command::Login { email, password } => {
      let password = match password {
        Some(p) => p,
        None => read_password()?,
      };
      Action::Login { email, password }
    }
    Command::Logout => Action::Logout,
    Command::Status => Action::Status,
    Command::Profile => Action::Profile,
  };

  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("creating {}", parent.display()))?;
  }
  let store = SqliteSessionStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open session store at {store_path:?}"))?;
  let client = ApiClient::new(cfg.api())?;

  let app = App::start(client, store).await;
  for line in app.run(action).await? {
    println!("{line}");
  }

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  stdin
    .lock()
    .read_line(&mut line)
    .context("reading password")?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
