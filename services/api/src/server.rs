use crate::cli::ServeArgs;
use crate::demo::seed_listings;
use crate::infra::{build_service, AppState};
use crate::routes::with_estate_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use estate::config::AppConfig;
use estate::error::AppError;
use estate::telemetry;
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

    let (service, backends) = build_service(&config);
    if args.seed {
        let seeded = seed_listings(&service)?;
        info!(listings = seeded.len(), "sample listings loaded");
    }
    let service = Arc::new(service);

    let app = with_estate_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        crm = backends.crm.is_some(),
        "estate pipeline ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
