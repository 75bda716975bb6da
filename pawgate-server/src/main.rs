use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use pawgate::{Pawgate, PawgateBuilder, RepositoryProvider};
use pawgate_axum::{CookieConfig, Key, admin_routes, cookie_key_from_secret};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,pawgate=debug";

/// Admin login gate for the marketing site
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "PAWGATE_LISTEN", default_value = "0.0.0.0:5000")]
    listen: SocketAddr,

    /// SQLite database URL; state is kept in memory when omitted
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Mark the session cookie `Secure` (requires HTTPS)
    #[arg(long, env = "PAWGATE_SECURE_COOKIES")]
    secure_cookies: bool,

    /// Take client addresses from X-Forwarded-For / X-Real-IP
    #[arg(long, env = "PAWGATE_TRUST_PROXY")]
    trust_proxy: bool,

    /// Secret for signing the session cookie
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    session_secret: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Run database migrations
    Migrate,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    match cli.command.as_ref().unwrap_or(&Commands::Serve) {
        Commands::Version => {
            println!("pawgate v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Migrate => {
            let url = cli
                .database_url
                .as_deref()
                .context("--database-url or DATABASE_URL is required to migrate")?;
            let repositories = pawgate_storage_sqlite::connect(url).await?;
            repositories.migrate().await?;
            repositories.health_check().await?;
            tracing::info!("Database migrations completed");
            Ok(())
        }
        Commands::Serve => match cli.database_url.as_deref() {
            Some(url) => {
                let pawgate = PawgateBuilder::new()
                    .with_sqlite(url)
                    .await?
                    .apply_migrations(true)
                    .build()
                    .await?;
                tracing::info!("Using SQLite storage");
                serve(pawgate, &cli).await
            }
            None => {
                let pawgate = PawgateBuilder::new().with_memory_storage().build().await?;
                tracing::info!("Using in-memory storage");
                serve(pawgate, &cli).await
            }
        },
    }
}

fn cookie_key(secret: Option<&str>) -> Key {
    match secret.filter(|s| !s.is_empty()) {
        Some(secret) => cookie_key_from_secret(secret),
        None => {
            tracing::warn!(
                "SESSION_SECRET is not set, using a random secret; sessions will not survive a restart"
            );
            Key::generate()
        }
    }
}

async fn serve<R: RepositoryProvider + 'static>(pawgate: Pawgate<R>, cli: &Cli) -> anyhow::Result<()> {
    let pawgate = Arc::new(pawgate);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tasks = pawgate.start_maintenance_tasks(shutdown_rx);

    let app = admin_routes(pawgate)
        .with_cookie_config(CookieConfig::default().secure(cli.secure_cookies))
        .with_cookie_key(cookie_key(cli.session_secret.as_deref()))
        .trust_proxy(cli.trust_proxy)
        .build();

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Failed to bind {}", cli.listen))?;
    tracing::info!(address = %cli.listen, "Admin API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = shutdown_tx.send(true);
    for task in tasks {
        let _ = task.await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
    tracing::info!("Shutdown signal received");
}
