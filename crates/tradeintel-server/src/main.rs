mod api;
mod middleware;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use tradeintel_search::{
    EnvCredentials, Fetcher, FetcherConfig, Orchestrator, SourceContext, SourceRegistry,
};

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = tradeintel_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let fetcher = Fetcher::new(&FetcherConfig::from_config(&config))?;
    let ctx = SourceContext::new(Arc::new(fetcher), Arc::new(EnvCredentials));
    let registry = SourceRegistry::builtin();
    tracing::info!(
        env = %config.env,
        sources = registry.len(),
        "source registry ready"
    );
    let orchestrator = Orchestrator::new(
        Arc::new(registry),
        Arc::new(ctx),
        Duration::from_secs(config.search_budget_secs),
    );

    let app = build_app(AppState {
        orchestrator: Arc::new(orchestrator),
        default_max_results: config.default_max_results,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
