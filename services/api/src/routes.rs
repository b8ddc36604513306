use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use placement_tracker::placement::records::{
    paper_media_type, placement_router, AuthService, PaperStorage, PlacementRepository,
    PlacementService,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_placement_routes<R, S>(
    service: Arc<PlacementService<R, S>>,
    auth: Arc<AuthService>,
) -> axum::Router
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    placement_router(service, auth)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/uploads/:file", axum::routing::get(uploaded_file))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Serves a stored model paper. Accepted paper types are served inline; any
/// other file is forced to download as an opaque attachment.
pub(crate) async fn uploaded_file(
    Extension(state): Extension<AppState>,
    Path(file): Path<String>,
) -> Response {
    if file.is_empty() || file.starts_with('.') || file.contains(['/', '\\']) {
        return not_found(&file);
    }

    match tokio::fs::read(state.upload_dir.join(&file)).await {
        Ok(bytes) => {
            let disposition = match paper_media_type(&file) {
                Some(media_type) => (media_type, "inline".to_string()),
                None => (
                    mime_guess::mime::APPLICATION_OCTET_STREAM,
                    format!("attachment; filename=\"{file}\""),
                ),
            };
            let (content_type, content_disposition) = disposition;
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type.essence_str().to_string()),
                    (header::CONTENT_DISPOSITION, content_disposition),
                    (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
                ],
                bytes,
            )
                .into_response()
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => not_found(&file),
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

fn not_found(file: &str) -> Response {
    let payload = json!({ "error": format!("file '{file}' not found") });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}
