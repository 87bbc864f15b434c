use crate::cli::ServeArgs;
use crate::demo::seed_demo_store;
use crate::infra::AppState;
use crate::routes::with_engagement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use insertion_tracker::config::AppConfig;
use insertion_tracker::error::AppError;
use insertion_tracker::telemetry;
use insertion_tracker::workflows::engagement::{
    ChannelRefreshQueue, EngagementService, StatusRefreshWorker,
};
use insertion_tracker::workflows::store::InMemoryOutcomeStore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryOutcomeStore::default());
    if args.seed_demo {
        let seeded = seed_demo_store(&store, Utc::now())?;
        info!(contexts = seeded, "seeded demo program contexts");
    }

    let (queue, receiver) = ChannelRefreshQueue::channel();
    tokio::spawn(StatusRefreshWorker::new(store.clone()).run(receiver));

    let engagement_service = Arc::new(EngagementService::new(
        store,
        Arc::new(queue),
        &config.engagement,
    ));

    let app = with_engagement_routes(
        engagement_service,
        config.engagement.seen_rate_windows.clone(),
    )
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "insertion tracker ready");

    axum::serve(listener, app).await?;
    Ok(())
}
