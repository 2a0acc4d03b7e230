use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use smp_review::config::AppConfig;
use smp_review::error::AppError;
use smp_review::telemetry;
use smp_review::workflows::intake::UserImporter;
use smp_review::workflows::review::{AdminService, ReviewPolicy, ReviewPortal, ReviewService};
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryReviewRepository, InMemorySettingsRepository, InMemoryUserRepository,
    SeedPasswordHasher, TracingAuditSink,
};
use crate::routes::with_portal_routes;

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

    let users = Arc::new(InMemoryUserRepository::default());
    if let Some(path) = &config.review.seed_csv {
        let hasher = SeedPasswordHasher::from_env();
        let summary = UserImporter::from_path(path, users.as_ref(), &hasher)?;
        info!(
            path = %path.display(),
            created = summary.created,
            updated = summary.updated,
            "seeded account store"
        );
    }
    let reviews = Arc::new(InMemoryReviewRepository::default());
    let settings = Arc::new(InMemorySettingsRepository::default());
    let audit = Arc::new(TracingAuditSink);
    let policy = ReviewPolicy {
        settings_cache_ttl: config.review.settings_cache_ttl,
        ..ReviewPolicy::default()
    };

    let review_service = Arc::new(ReviewService::new(
        users.clone(),
        reviews.clone(),
        settings.clone(),
        audit.clone(),
        policy,
    ));
    let admin_service = Arc::new(AdminService::new(users, reviews, settings, audit));

    let app = with_portal_routes(ReviewPortal {
        reviews: review_service,
        admin: admin_service,
    })
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "smp review portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
