use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryApplicationRepository, LoggingNotificationPublisher};
use crate::routes::with_onboarding_routes;
use agent_onboarding::config::AppConfig;
use agent_onboarding::error::AppError;
use agent_onboarding::telemetry;
use agent_onboarding::workflows::onboarding::{GatePolicy, OnboardingService};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let notifications = Arc::new(LoggingNotificationPublisher);
    let service = Arc::new(OnboardingService::new(
        repository,
        notifications,
        GatePolicy::default(),
    ));

    let app = with_onboarding_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "agent onboarding service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
