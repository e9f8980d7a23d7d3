use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::job_dto::{CreateJobPayload, JobListQuery, JobListResponse, JobResponse},
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/jobs",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("limit" = Option<i64>, Query, description = "Items per page"),
        ("title" = Option<String>, Query, description = "Title substring filter"),
        ("location" = Option<String>, Query, description = "Location substring filter"),
        ("country" = Option<String>, Query, description = "Country substring filter"),
        ("work_type" = Option<String>, Query, description = "Work type substring filter"),
        ("job_type" = Option<String>, Query, description = "Job type substring filter"),
        ("search" = Option<String>, Query, description = "Matches title or company name")
    ),
    responses(
        (status = 200, description = "Active job postings", body = Json<JobListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse> {
    let result = state.job_service.list(query).await?;
    Ok(Json(JobListResponse::from(result)))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{slug}",
    params(
        ("slug" = String, Path, description = "Job slug")
    ),
    responses(
        (status = 200, description = "Job found", body = Json<JobResponse>),
        (status = 404, description = "Job not found or not active")
    )
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get_by_slug(&slug).await?;
    Ok(Json(JobResponse::from(job)))
}

#[utoipa::path(
    post,
    path = "/api/jobs",
    request_body = CreateJobPayload,
    responses(
        (status = 201, description = "Job created", body = Json<JobResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Caller is not an employer or admin")
    )
)]
#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let created_by = claims.user_id()?;
    let job = state.job_service.create(payload, created_by).await?;
    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}
