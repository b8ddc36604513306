use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAccountRepository, InMemoryPlacementRepository, InMemorySessionStore,
    LocalPaperStorage,
};
use crate::routes::with_placement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use placement_tracker::config::AppConfig;
use placement_tracker::error::AppError;
use placement_tracker::placement::records::{AuthService, PlacementService};
use placement_tracker::placement::SnapshotImporter;
use placement_tracker::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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
        upload_dir: Arc::new(config.storage.upload_dir.clone()),
    };

    let repository = Arc::new(InMemoryPlacementRepository::default());
    if let (Some(companies), Some(students)) = (args.companies.take(), args.students.take()) {
        let snapshot = SnapshotImporter::from_paths(&companies, &students)?;
        info!(
            companies = snapshot.companies.len(),
            students = snapshot.students.len(),
            "seeding placement store from CSV"
        );
        repository.seed(snapshot).map_err(|err| {
            AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })?;
    }

    if config.auth.admin.is_none() {
        warn!("APP_ADMIN_EMAIL/APP_ADMIN_PASSWORD unset; administrator login is disabled");
    }

    let storage = Arc::new(LocalPaperStorage::new(config.storage.upload_dir.clone()));
    let placement_service = Arc::new(PlacementService::new(
        repository,
        storage,
        config.storage.max_upload_bytes,
    ));
    let auth = Arc::new(AuthService::new(
        Arc::new(InMemoryAccountRepository::default()),
        Arc::new(InMemorySessionStore::default()),
        config.auth.admin.clone(),
    )?);

    let app = with_placement_routes(placement_service, auth)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "placement tracker ready");

    axum::serve(listener, app).await?;
    Ok(())
}
