use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use super::super::domain::{CompanyId, ModelPaperId, StudentId};
use super::super::report::{ReportError, ReportFormat};
use super::auth::{AuthError, AuthService, Credentials, Principal, Registration};
use super::domain::{CompanyDraft, PaperUpload, StudentDraft};
use super::repository::{PlacementRepository, RepositoryError};
use super::service::{PlacementService, PlacementServiceError};
use super::storage::PaperStorage;

/// Shared handler state: the records service plus session resolution.
pub struct PlacementApi<R, S> {
    pub service: Arc<PlacementService<R, S>>,
    pub auth: Arc<AuthService>,
}

impl<R, S> Clone for PlacementApi<R, S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            auth: Arc::clone(&self.auth),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaperQuery {
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportQuery {
    pub(crate) format: String,
}

/// Router builder exposing auth, records, and report endpoints.
pub fn placement_router<R, S>(
    service: Arc<PlacementService<R, S>>,
    auth: Arc<AuthService>,
) -> Router
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    // Leave room above the cap so oversized uploads reach the service's own check.
    let body_limit = usize::try_from(service.max_upload_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(1);

    Router::new()
        .route("/api/v1/auth/register", post(register_handler::<R, S>))
        .route("/api/v1/auth/login", post(login_handler::<R, S>))
        .route("/api/v1/auth/admin/login", post(admin_login_handler::<R, S>))
        .route("/api/v1/auth/logout", post(logout_handler::<R, S>))
        .route(
            "/api/v1/companies",
            get(list_companies_handler::<R, S>).post(create_company_handler::<R, S>),
        )
        .route(
            "/api/v1/companies/:company_id",
            get(company_details_handler::<R, S>)
                .put(update_company_handler::<R, S>)
                .delete(delete_company_handler::<R, S>),
        )
        .route(
            "/api/v1/companies/:company_id/students",
            post(add_student_handler::<R, S>),
        )
        .route(
            "/api/v1/students/:student_id",
            put(update_student_handler::<R, S>).delete(delete_student_handler::<R, S>),
        )
        .route(
            "/api/v1/companies/:company_id/papers",
            post(upload_paper_handler::<R, S>),
        )
        .route(
            "/api/v1/papers/:paper_id",
            axum::routing::delete(delete_paper_handler::<R, S>),
        )
        .route("/api/v1/reports/summary", get(summary_handler::<R, S>))
        .route("/api/v1/reports/export", get(export_handler::<R, S>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(PlacementApi { service, auth })
}

pub(crate) async fn register_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    Json(registration): Json<Registration>,
) -> Response {
    let auth = Arc::clone(&api.auth);
    match run_blocking(move || auth.register_student(registration)).await {
        Ok(Ok(session)) => (StatusCode::CREATED, Json(session)).into_response(),
        Ok(Err(error)) => auth_error_response(error),
        Err(response) => response,
    }
}

pub(crate) async fn login_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    Json(credentials): Json<Credentials>,
) -> Response {
    let auth = Arc::clone(&api.auth);
    match run_blocking(move || auth.login_student(credentials)).await {
        Ok(Ok(session)) => (StatusCode::OK, Json(session)).into_response(),
        Ok(Err(error)) => auth_error_response(error),
        Err(response) => response,
    }
}

pub(crate) async fn admin_login_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    Json(credentials): Json<Credentials>,
) -> Response {
    let auth = Arc::clone(&api.auth);
    match run_blocking(move || auth.login_admin(credentials)).await {
        Ok(Ok(session)) => (StatusCode::OK, Json(session)).into_response(),
        Ok(Err(error)) => auth_error_response(error),
        Err(response) => response,
    }
}

pub(crate) async fn logout_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return auth_error_response(AuthError::Unauthenticated);
    };
    match api.auth.logout(token) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => auth_error_response(error),
    }
}

pub(crate) async fn list_companies_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
) -> Response
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    let principal = match principal(&api, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match api.service.companies(&principal) {
        Ok(companies) => (StatusCode::OK, Json(companies)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn create_company_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
    Json(draft): Json<CompanyDraft>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    let principal = match principal(&api, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match api.service.create_company(&principal, draft) {
        Ok(company) => (StatusCode::CREATED, Json(company)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn company_details_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
    Path(company_id): Path<i64>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    let principal = match principal(&api, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match api.service.company_details(&principal, CompanyId(company_id)) {
        Ok(details) => (StatusCode::OK, Json(details)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn update_company_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
    Path(company_id): Path<i64>,
    Json(draft): Json<CompanyDraft>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    let principal = match principal(&api, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match api
        .service
        .update_company(&principal, CompanyId(company_id), draft)
    {
        Ok(company) => (StatusCode::OK, Json(company)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn delete_company_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
    Path(company_id): Path<i64>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    let principal = match principal(&api, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    let service = Arc::clone(&api.service);
    match run_blocking(move || service.delete_company(&principal, CompanyId(company_id))).await {
        Ok(Ok(removal)) => (StatusCode::OK, Json(removal)).into_response(),
        Ok(Err(error)) => service_error_response(error),
        Err(response) => response,
    }
}

pub(crate) async fn add_student_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
    Path(company_id): Path<i64>,
    Json(draft): Json<StudentDraft>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    let principal = match principal(&api, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match api
        .service
        .add_student(&principal, CompanyId(company_id), draft)
    {
        Ok(student) => (StatusCode::CREATED, Json(student)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn update_student_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
    Path(student_id): Path<i64>,
    Json(draft): Json<StudentDraft>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    let principal = match principal(&api, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match api
        .service
        .update_student(&principal, StudentId(student_id), draft)
    {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn delete_student_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
    Path(student_id): Path<i64>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    let principal = match principal(&api, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match api.service.delete_student(&principal, StudentId(student_id)) {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn upload_paper_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
    Path(company_id): Path<i64>,
    Query(query): Query<PaperQuery>,
    body: Bytes,
) -> Response
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    let principal = match principal(&api, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    let upload = PaperUpload {
        name: query.name,
        bytes: body.to_vec(),
    };
    let service = Arc::clone(&api.service);
    let outcome =
        run_blocking(move || service.upload_model_paper(&principal, CompanyId(company_id), upload))
            .await;
    match outcome {
        Ok(Ok(paper)) => (StatusCode::CREATED, Json(paper)).into_response(),
        Ok(Err(error)) => service_error_response(error),
        Err(response) => response,
    }
}

pub(crate) async fn delete_paper_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
    Path(paper_id): Path<i64>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    let principal = match principal(&api, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    let service = Arc::clone(&api.service);
    match run_blocking(move || service.delete_model_paper(&principal, ModelPaperId(paper_id))).await {
        Ok(Ok(paper)) => (StatusCode::OK, Json(paper)).into_response(),
        Ok(Err(error)) => service_error_response(error),
        Err(response) => response,
    }
}

pub(crate) async fn summary_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
) -> Response
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    let principal = match principal(&api, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    match api.service.summary(&principal) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn export_handler<R, S>(
    State(api): State<PlacementApi<R, S>>,
    headers: HeaderMap,
    Query(query): Query<ExportQuery>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: PaperStorage + 'static,
{
    let principal = match principal(&api, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    let format = match query.format.parse::<ReportFormat>() {
        Ok(format) => format,
        Err(error) => return service_error_response(error.into()),
    };

    let generated_at = Local::now().naive_local();
    let service = Arc::clone(&api.service);
    let outcome =
        run_blocking(move || service.export_report(&principal, format, generated_at)).await;
    match outcome {
        Ok(Ok(artifact)) => {
            let disposition = format!("attachment; filename=\"{}\"", artifact.file_name);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, artifact.content_type().to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                artifact.bytes,
            )
                .into_response()
        }
        Ok(Err(error)) => service_error_response(error),
        Err(response) => response,
    }
}

/// Moves synchronous work (file I/O, hashing, rendering) off the async workers.
pub(super) async fn run_blocking<T, F>(work: F) -> Result<T, Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|err| {
        error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("request task failed: {err}"),
        )
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn principal<R, S>(api: &PlacementApi<R, S>, headers: &HeaderMap) -> Result<Principal, Response> {
    let token = bearer_token(headers).ok_or_else(|| auth_error_response(AuthError::Unauthenticated))?;
    api.auth.authenticate(token).map_err(auth_error_response)
}

fn error_body(status: StatusCode, message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (status, Json(payload)).into_response()
}

pub(crate) fn auth_error_response(error: AuthError) -> Response {
    let status = match &error {
        AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AuthError::DuplicateEmail(_) => StatusCode::CONFLICT,
        AuthError::WeakPassword | AuthError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::Hashing(_) | AuthError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, error.to_string())
}

pub(crate) fn service_error_response(error: PlacementServiceError) -> Response {
    let status = match &error {
        PlacementServiceError::Forbidden => StatusCode::FORBIDDEN,
        PlacementServiceError::NotFound { .. }
        | PlacementServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        PlacementServiceError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
        PlacementServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PlacementServiceError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        PlacementServiceError::Report(ReportError::UnsupportedFormat(_)) => StatusCode::BAD_REQUEST,
        PlacementServiceError::Repository(RepositoryError::Unavailable(_))
        | PlacementServiceError::Storage(_)
        | PlacementServiceError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, error.to_string())
}
