//! gym-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered under
//! `GYM_*` environment variables, opens the SQLite store, starts the status
//! sweep scheduler and serves the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for an account's `password_hash`:
//!
//! ```
//! cargo run -p gym-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use gym_api::ApiState;
use gym_core::lifecycle::LifecycleService;
use gym_server::{ServerConfig, schedule::run_scheduler};
use gym_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Gym subscriptions server")]
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
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("GYM"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  anyhow::ensure!(server_cfg.sweep_interval_secs > 0, "sweep_interval_secs must be positive");
  if server_cfg.accounts.is_empty() {
    warn!("no accounts configured; every API request will be rejected");
  }

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let service = LifecycleService::new(Arc::new(store)).with_span(info_span!("subscriptions"));
  let shutdown = CancellationToken::new();

  let scheduler = tokio::spawn(
    run_scheduler(
      service.clone(),
      server_cfg.sweep_interval(),
      server_cfg.sweep_on_startup,
      shutdown.clone(),
    ),
  );

  let app = gym_server::router(
    ApiState::new(service, shutdown.clone()),
    Arc::new(server_cfg.auth()),
  );
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let signal = shutdown.clone();
  axum::serve(listener, app)
    .with_graceful_shutdown(async move {
      shutdown_signal().await;
      info!("shutting down");
      signal.cancel();
    })
    .await
    .context("server error")?;

  // Also reached when the server stopped for another reason.
  shutdown.cancel();
  if let Err(e) = scheduler.await {
    error!(error = %e, "sweep scheduler panicked");
  }

  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(err) = tokio::signal::ctrl_c().await {
      error!(error = %err, "unable to install Ctrl+C signal handler");
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
      Ok(mut signal) => {
        signal.recv().await;
      }
      Err(err) => {
        error!(error = %err, "unable to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
