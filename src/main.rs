use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use panel_config::{
    api,
    assets::AssetStore,
    config::{Config, VersionSource},
    states::StateProvider,
    storage::ConfigStore,
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Load configuration
    let config = Config::load()?;
    match &config.version.source {
        VersionSource::Manifest(path) => info!(
            version = %config.version.value,
            manifest = %path.display(),
            "panel-config starting"
        ),
        VersionSource::Default(reason) => warn!(
            version = %config.version.value,
            reason = %reason,
            "Add-on manifest unavailable, using built-in version"
        ),
    }
    info!(
        mode = ?config.mode,
        config_root = %config.paths.config_root.display(),
        live_root = %config.paths.live_root.display(),
        asset_root = %config.paths.asset_root.display(),
        "Loaded configuration"
    );

    let store = ConfigStore::open(&config.paths.config_root, &config.paths.live_root)?;
    let assets = AssetStore::new(&config.paths.asset_root)?;
    let states = StateProvider::new(&config.home_assistant)?;
    if states.is_configured() {
        info!("Home Assistant entity lookups enabled");
    }

    // Create shared state
    let state = Arc::new(AppState {
        assets,
        config: config.clone(),
        states,
        store,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on: {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
