use crate::config::Config;
use crate::data;
use crate::model::{MultiOutputForest, RiskPredictor};
use crate::state::{AppState, WebSettings};
use crate::utils::fmt_duration;
use crate::web::create_router;
use anyhow::Context;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use yansi::Paint;

const MAX_CONNECTIONS: u32 = 4;

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    db_pool: SqlitePool,
    app_state: AppState,
}

impl App {
    /// Connect the database, load the model and build the shared state.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let db_pool = data::connect(&config.database_url, MAX_CONNECTIONS)
            .await
            .context("Failed to open database")?;
        info!(
            database_url = %config.database_url,
            max_connections = MAX_CONNECTIONS,
            "database ready"
        );

        let model_path = config.model_path.clone();
        let start = Instant::now();
        let model = tokio::task::spawn_blocking(move || MultiOutputForest::load_risk_model(&model_path))
            .await?
            .with_context(|| {
                format!(
                    "Failed to load model from {} (run `healthrisk train` first)",
                    config.model_path.display()
                )
            })?;
        let summary = model.summary();
        info!(
            path = %config.model_path.display(),
            estimators = summary.n_estimators,
            outputs = summary.n_outputs,
            trained_at = summary.trained_at.as_deref().unwrap_or("unknown"),
            duration = fmt_duration(start.elapsed()),
            "model loaded"
        );

        tokio::fs::create_dir_all(&config.upload_dir)
            .await
            .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;

        let app_state = AppState::new(db_pool.clone(), Arc::new(model), WebSettings::from(&config));

        match app_state.sessions.purge_expired().await {
            Ok(0) => {}
            Ok(n) => info!(count = n, "purged expired sessions"),
            Err(e) => warn!(error = ?e, "Failed to purge expired sessions (non-fatal)"),
        }

        Ok(App {
            config,
            db_pool,
            app_state,
        })
    }

    /// Serve until a shutdown signal arrives, then drain within `shutdown_timeout`.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(address = %addr, "web server listening");

        let router = create_router(self.app_state);
        let token = CancellationToken::new();
        let server_token = token.clone();
        let mut server = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { server_token.cancelled().await })
            .await
        });

        tokio::select! {
            result = &mut server => {
                return result?.context("web server stopped unexpectedly");
            }
            signal = shutdown_signal() => {
                info!(signal, "shutdown signal received");
            }
        }

        token.cancel();
        let start = Instant::now();
        let timeout = self.config.shutdown_timeout;
        match tokio::time::timeout(timeout, server).await {
            Ok(joined) => {
                joined??;
                info!(duration = fmt_duration(start.elapsed()), "graceful shutdown complete");
            }
            Err(_) => {
                warn!(timeout = fmt_duration(timeout), "graceful shutdown timed out, dropping connections");
            }
        }

        self.db_pool.close().await;
        Ok(())
    }
}

/// Resolves with the name of the first termination signal received.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// `healthrisk users`: list registered accounts.
pub async fn print_users(config: &Config) -> Result<(), anyhow::Error> {
    let pool = data::connect(&config.database_url, 1).await?;
    let users = data::users::list_users(&pool).await?;

    println!("{}", format!("{} registered users", users.len()).bold());
    for user in &users {
        println!("{:>5}  {}", user.id.dim(), user.username);
    }
    pool.close().await;
    Ok(())
}

/// `healthrisk predictions`: dump the prediction table.
pub async fn print_predictions(config: &Config) -> Result<(), anyhow::Error> {
    let pool = data::connect(&config.database_url, 1).await?;
    let rows = data::predictions::list_all(&pool).await?;

    println!("{}", format!("{} stored predictions", rows.len()).bold());
    for row in &rows {
        let risks = row
            .risks
            .iter()
            .map(|(name, value)| format!("{name}: {value:.2}%"))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{:>5}  {}  {}  highest={}  [{}]",
            row.id.dim(),
            row.date,
            row.username.cyan(),
            row.highest_risk.yellow(),
            risks
        );
    }
    pool.close().await;
    Ok(())
}
