use crate::cli::ServeArgs;
use crate::infra::{forecast_provider, AppState};
use crate::routes::with_requisition_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use talent_hub::config::AppConfig;
use talent_hub::error::AppError;
use talent_hub::telemetry;
use talent_hub::workflows::requisition::{InMemoryRequisitionStore, RequisitionService};
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

    let store = Arc::new(InMemoryRequisitionStore::default());
    let forecasts = Arc::new(forecast_provider(&config.workflow)?);
    let requisition_service = Arc::new(RequisitionService::with_settings(
        store,
        forecasts,
        config.workflow.service_settings(),
    ));

    let app = with_requisition_routes(requisition_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        page_limit = config.workflow.page_limit,
        "requisition approval service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
