//! # API REST
//!
//! REST API implementation for Filebox.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (multipart uploads, JSON errors, CORS)
//!
//! Uses `api-shared` for DTOs and caller identification, and `filebox-core` for all file
//! operations.

#![warn(rust_2018_idioms)]

use api_shared::{
    parse_identity, validate_api_key, AuthError, ErrorRes, FileRecordRes, HealthRes,
    HealthService, ListFilesQuery, SyncCompareReq, SyncCompareRes, API_KEY_HEADER,
    USER_ID_HEADER, USER_NAME_HEADER,
};
use axum::{
    extract::{
        multipart::MultipartError, DefaultBodyLimit, FromRequestParts, Multipart,
        Path as AxumPath, Query, State,
    },
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use filebox_core::{
    content_type_for, ErrorKind, FileError, FileId, Filebox, Identity, IncomingFile,
    SortDirection,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Allowance for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    filebox: Filebox,
    api_key: Option<Arc<str>>,
    max_upload_bytes: usize,
}

impl AppState {
    pub fn new(filebox: Filebox, api_key: Option<String>, max_upload_bytes: usize) -> Self {
        Self {
            filebox,
            api_key: api_key.map(Arc::from),
            max_upload_bytes,
        }
    }
}

/// Multipart upload form: one file part.
#[derive(ToSchema)]
#[allow(dead_code)]
struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        upload_file,
        list_files,
        get_file,
        replace_file,
        delete_file,
        download_file,
        sync_compare,
        sync_remote_files,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        FileRecordRes,
        SyncCompareReq,
        SyncCompareRes,
        UploadForm,
    ))
)]
struct ApiDoc;

/// Builds the REST router with all endpoints and the Swagger UI.
pub fn router(state: AppState) -> Router {
    let body_limit = state
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health))
        .route("/api/files", post(upload_file).get(list_files))
        .route(
            "/api/files/:id",
            get(get_file).put(replace_file).delete(delete_file),
        )
        .route("/api/files/:id/content", get(download_file))
        .route("/api/sync/compare", post(sync_compare))
        .route("/api/sync/remote-files", get(sync_remote_files))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error returned by every handler, rendered as `{ "error": "..." }`.
#[derive(Debug)]
pub enum ApiError {
    File(FileError),
    Unauthorized(AuthError),
    Forbidden(String),
    BadRequest(String),
    PayloadTooLarge(String),
}

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        Self::File(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::File(err) => match err.kind() {
                ErrorKind::Validation => (StatusCode::BAD_REQUEST, err.to_string()),
                ErrorKind::Conflict => (StatusCode::CONFLICT, err.to_string()),
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
                ErrorKind::Integrity | ErrorKind::Storage => {
                    tracing::error!(error = ?err, "request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_string(),
                    )
                }
            },
            ApiError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err.to_string()),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::PayloadTooLarge(message) => (StatusCode::PAYLOAD_TOO_LARGE, message),
        };

        (status, Json(ErrorRes::new(message))).into_response()
    }
}

/// The authenticated caller, taken from the identity gateway headers.
pub struct Caller(pub Identity);

#[axum::async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        validate_api_key(
            state.api_key.as_deref(),
            header_str(&parts.headers, API_KEY_HEADER),
        )?;
        let identity = parse_identity(
            header_str(&parts.headers, USER_ID_HEADER),
            header_str(&parts.headers, USER_NAME_HEADER),
        )?;
        Ok(Caller(identity))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn parse_file_id(raw: &str) -> Result<FileId, ApiError> {
    Ok(raw.parse::<FileId>()?)
}

/// Reads the first file part of a multipart body.
async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<IncomingFile, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "file exceeds the {max_bytes} byte upload limit"
            )));
        }
        return Ok(IncomingFile::new(file_name, bytes.to_vec()));
    }

    Err(ApiError::BadRequest("no file part in request".into()))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// `attachment; filename="..."` with the name reduced to header-safe ASCII.
fn attachment_disposition(name: &str) -> HeaderValue {
    let safe: String = name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/api/files",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored", body = FileRecordRes),
        (status = 400, description = "Empty content or unusable name", body = ErrorRes),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorRes),
        (status = 409, description = "Caller already has a file with this name", body = ErrorRes),
        (status = 413, description = "File too large", body = ErrorRes)
    )
)]
/// Upload a new file owned by the caller
#[axum::debug_handler]
async fn upload_file(
    State(state): State<AppState>,
    Caller(caller): Caller,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FileRecordRes>), ApiError> {
    let file = read_upload(multipart, state.max_upload_bytes).await?;
    let record = state.filebox.files.upload(file, &caller)?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[utoipa::path(
    get,
    path = "/api/files",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "All files", body = [FileRecordRes]),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorRes)
    )
)]
/// List all files, optionally sorted by type and filtered to some types
#[axum::debug_handler]
async fn list_files(
    State(state): State<AppState>,
    Caller(_caller): Caller,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<FileRecordRes>>, ApiError> {
    let query = ListFilesQuery::from_pairs(pairs).map_err(ApiError::BadRequest)?;
    let direction = query.ascending.map(SortDirection::from_ascending);
    let records = state
        .filebox
        .listing
        .sort_and_filter(direction, &query.type_list())?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/files/{id}",
    params(("id" = u64, Path, description = "File id")),
    responses(
        (status = 200, description = "File metadata", body = FileRecordRes),
        (status = 404, description = "No such file", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_file(
    State(state): State<AppState>,
    Caller(_caller): Caller,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<FileRecordRes>, ApiError> {
    let record = state.filebox.files.get_metadata(parse_file_id(&id)?)?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    put,
    path = "/api/files/{id}",
    params(("id" = u64, Path, description = "File id")),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File replaced", body = FileRecordRes),
        (status = 400, description = "Empty content or unusable name", body = ErrorRes),
        (status = 404, description = "No such file", body = ErrorRes),
        (status = 409, description = "Concurrent update or name taken", body = ErrorRes)
    )
)]
/// Replace a file's content; the caller becomes its last editor
#[axum::debug_handler]
async fn replace_file(
    State(state): State<AppState>,
    Caller(caller): Caller,
    AxumPath(id): AxumPath<String>,
    multipart: Multipart,
) -> Result<Json<FileRecordRes>, ApiError> {
    let id = parse_file_id(&id)?;
    let file = read_upload(multipart, state.max_upload_bytes).await?;
    let record = state.filebox.files.replace(id, file, &caller)?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    params(("id" = u64, Path, description = "File id")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 403, description = "Caller does not own the file", body = ErrorRes),
        (status = 404, description = "No such file", body = ErrorRes)
    )
)]
/// Delete a file; only its owner may do so
#[axum::debug_handler]
async fn delete_file(
    State(state): State<AppState>,
    Caller(caller): Caller,
    AxumPath(id): AxumPath<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_file_id(&id)?;
    let record = state.filebox.files.get_metadata(id)?;
    if record.owner_id != caller.user_id() {
        return Err(ApiError::Forbidden(
            "only the owner can delete this file".into(),
        ));
    }

    state.filebox.files.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/files/{id}/content",
    params(("id" = u64, Path, description = "File id")),
    responses(
        (status = 200, description = "Raw file content", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 404, description = "No such file", body = ErrorRes),
        (status = 500, description = "Content unavailable", body = ErrorRes)
    )
)]
/// Download a file's content as an attachment
#[axum::debug_handler]
async fn download_file(
    State(state): State<AppState>,
    Caller(_caller): Caller,
    AxumPath(id): AxumPath<String>,
) -> Result<Response, ApiError> {
    let (record, bytes) = state.filebox.files.fetch(parse_file_id(&id)?)?;

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type_for(&record.file_type)),
        ),
        (header::CONTENT_DISPOSITION, attachment_disposition(&record.name)),
    ];
    Ok((headers, bytes).into_response())
}

#[utoipa::path(
    post,
    path = "/api/sync/compare",
    request_body = SyncCompareReq,
    responses(
        (status = 200, description = "Names to upload and download", body = SyncCompareRes),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorRes)
    )
)]
/// Compare the caller's local file names with their remote files
#[axum::debug_handler]
async fn sync_compare(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<SyncCompareReq>,
) -> Result<Json<SyncCompareRes>, ApiError> {
    let plan = state.filebox.sync.compare(caller.user_id(), req.local_files)?;
    Ok(Json(plan.into()))
}

#[utoipa::path(
    get,
    path = "/api/sync/remote-files",
    responses(
        (status = 200, description = "The caller's files", body = [FileRecordRes]),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn sync_remote_files(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<FileRecordRes>>, ApiError> {
    let records = state.filebox.sync.remote_files(caller.user_id())?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}
