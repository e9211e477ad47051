mod config;

use chatgate::{
    AppState, build_metrics_layer_and_handle, build_metrics_router, build_router,
    client::create_hyper_client,
    registry::{Models, WatchedFile},
    upstream::UpstreamService,
};
use clap::Parser as _;
use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument};

#[tokio::main]
#[instrument]
pub async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse().validate()?;
    info!("Starting chatgate with config: {:?}", config);

    let models = Models::from_config_file(&config.models)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load models: {}", e))?;

    if config.watch {
        models
            .receive_updates(WatchedFile(config.models.clone()))
            .await?;
    }

    let registry = Arc::new(models);
    let upstream = UpstreamService::new(create_hyper_client(config.pool()), registry.clone());
    let app_state = AppState::new(registry, Arc::new(upstream));
    let mut router = build_router(app_state);

    if config.metrics {
        let (prometheus_layer, handle) =
            build_metrics_layer_and_handle(config.metrics_prefix.clone());
        router = router.layer(prometheus_layer);

        let metrics_addr = format!("0.0.0.0:{}", config.metrics_port);
        let metrics_listener = TcpListener::bind(&metrics_addr).await?;
        info!("Metrics endpoint listening on {}", metrics_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, build_metrics_router(handle)).await {
                tracing::error!("Metrics server failed: {}", e);
            }
        });
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("chatgate listening on {}", bind_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
