//! catalog-service entry point

use catalog_service::{
    config::AppConfig,
    db,
    error::set_expose_details,
    handlers::health,
    middleware::AppState,
    repository::{PgUserRepository, UserStore},
    routes, telemetry,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("catalog-service {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // .env.<CATALOG_ENV> if set, otherwise .env.local > .env.development > .env
    if let Ok(env) = std::env::var("CATALOG_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    health::set_start_time();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    telemetry::init_telemetry(&config.logging);
    set_expose_details(config.server.expose_error_details);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "catalog-service starting");

    if config.security.uses_insecure_default_secret() {
        tracing::warn!(
            "security.jwt_secret is not set; signing tokens with the built-in development secret"
        );
    }

    let db_pool = db::create_pool(&config.database).await?;
    db::run_migrations(&db_pool).await?;
    db::record_pool_metrics(&db_pool);

    let store: Arc<dyn UserStore> = Arc::new(PgUserRepository::new(db_pool.clone()));
    let state = Arc::new(AppState::new(config.clone(), store)?);

    // a failed seed leaves the service usable, so it is logged rather than fatal
    if let Err(e) = state
        .auth_service
        .ensure_admin_user(&config.admin.username, config.admin.password.expose_secret())
        .await
    {
        tracing::error!(error = %e, "admin seeding failed");
    }

    spawn_session_purge(&state, Duration::from_secs(config.session.purge_interval_secs));

    let app = routes::create_router(state.clone());

    let listener = TcpListener::bind(&config.server.addr).await?;
    tracing::info!(addr = %config.server.addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.graceful_shutdown_timeout_secs))
        .await?;

    db_pool.close().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

fn spawn_session_purge(state: &AppState, interval: Duration) {
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            let evicted = sessions.purge_expired();
            if evicted > 0 {
                tracing::debug!(evicted, "purged idle sessions");
            }
        }
    });
}

/// Resolves on Ctrl+C or SIGTERM. In-flight requests get `timeout_secs` to drain
/// before the process exits anyway.
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
        tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        std::process::exit(1);
    });
}

fn print_help() {
    println!("catalog-service {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: catalog-service [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --version     Print version and exit");
    println!("  --help        Print this help and exit");
    println!();
    println!("Environment:");
    println!("  All settings come from CATALOG_* variables, nested keys separated by '__'");
    println!("  e.g. CATALOG_DATABASE__URL, CATALOG_SECURITY__JWT_SECRET");
}
