//! campus-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! document store and identity directory, and serves the JSON API.
//!
//! # Bootstrapping the first admin
//!
//! ```text
//! campus-server --create-admin head@school.example
//! ```
//!
//! prompts for a password on stdin, creates the account and its user record,
//! and exits.

use std::path::PathBuf;

use anyhow::Context as _;
use campus_core::users::bootstrap_admin;
use campus_server::{Backends, ServerConfig, app};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Campus school-administration server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create an Admin account with this login email, reading its password
  /// from stdin, and exit.
  #[arg(long, value_name = "EMAIL")]
  create_admin: Option<String>,

  /// Display name for `--create-admin`.
  #[arg(long, default_value = "Administrator", requires = "create_admin")]
  name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;
  let backends = Backends::open(&server_cfg).await?;

  if let Some(email) = cli.create_admin {
    let password = read_password()?;
    let account_id = bootstrap_admin(
      backends.directory.as_ref(),
      backends.store.as_ref(),
      &cli.name,
      &email,
      &password,
    )
    .await
    .context("failed to create admin account")?;
    println!("{account_id}");
    return Ok(());
  }

  let app = app(&server_cfg, &backends);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
