use doge_lib::{
    config::Settings,
    graphite::{self, GraphiteRecorder, GraphiteReporter, MetricsDecision},
    seed,
    storage::FlatFileStore,
    AppState,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Settings::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    // A store that cannot be opened is fatal to boot
    let storage = FlatFileStore::new(&config.data_dir)?;

    // Feature-detect the metrics collector exactly once
    match graphite::detect(&config.graphite) {
        MetricsDecision::Enabled(settings) => {
            let recorder = GraphiteRecorder::new();
            recorder.install()?;
            tracing::info!(
                host = %settings.host,
                port = settings.port,
                period_secs = settings.period_secs,
                "metrics collector reachable, reporter started"
            );
            GraphiteReporter::new(recorder, settings).start();
        },
        MetricsDecision::Disabled => {
            tracing::info!("metrics collector unreachable, reporting disabled");
        },
    }

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(storage, config)?);

    // Seed placeholder users before the listener accepts traffic
    seed::seed_users(&state.users).await?;

    let app = doge_lib::create_app(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
