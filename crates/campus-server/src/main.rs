//! Campus server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, brings its schema up to date once, and serves the JSON API.
//!
//! # Password hash generation
//!
//! To print the argon2 PHC string for a password:
//!
//! ```sh
//! cargo run -p campus-server -- --hash-password
//! ```

mod config;

use std::path::PathBuf;

use anyhow::Context as _;
use campus_api::{AppState, password::hash_password};
use campus_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Campus workflow server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    println!("{}", hash_password(&password)?);
    return Ok(());
  }

  let settings = ::config::Config::builder()
    .add_source(::config::File::from(cli.config).required(false))
    .add_source(::config::Environment::with_prefix("CAMPUS"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let database_path = server_cfg.database_path();
  let sql_root = server_cfg.sql_root();
  let store = SqliteStore::open(&database_path, &sql_root, server_cfg.busy_timeout())
    .await
    .with_context(|| {
      format!("failed to open store at {database_path:?} with assets from {sql_root:?}")
    })?;
  tracing::info!(
    database = %database_path.display(),
    assets = store.database().assets().len(),
    "store ready"
  );

  let app = campus_api::router(AppState::new(store, server_cfg.api()));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read one password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}
