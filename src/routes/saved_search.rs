use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::saved_search_dto::{
        CreateSavedSearchPayload, MatchingJobsQuery, MatchingJobsResponse, SavedSearchListResponse,
        SavedSearchResponse, UpdateSavedSearchPayload,
    },
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/saved-searches",
    request_body = CreateSavedSearchPayload,
    responses(
        (status = 201, description = "Saved search created with its initial match count", body = Json<SavedSearchResponse>),
        (status = 400, description = "Missing search name")
    )
)]
#[axum::debug_handler]
pub async fn create_saved_search(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSavedSearchPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user_id = claims.user_id()?;
    let search = state.saved_search_service.create(user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(SavedSearchResponse::from(search))))
}

#[utoipa::path(
    get,
    path = "/api/saved-searches",
    responses(
        (status = 200, description = "The caller's active saved searches, newest first", body = Json<SavedSearchListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_saved_searches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    let saved_searches = state.saved_search_service.list(user_id).await?;
    Ok(Json(SavedSearchListResponse { saved_searches }))
}

#[utoipa::path(
    patch,
    path = "/api/saved-searches/{id}",
    params(
        ("id" = Uuid, Path, description = "Saved search ID")
    ),
    request_body = UpdateSavedSearchPayload,
    responses(
        (status = 200, description = "Saved search updated, match count recomputed", body = Json<SavedSearchResponse>),
        (status = 404, description = "Saved search not found or not owned")
    )
)]
#[axum::debug_handler]
pub async fn update_saved_search(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSavedSearchPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user_id = claims.user_id()?;
    let search = state
        .saved_search_service
        .update(user_id, id, payload)
        .await?;
    Ok(Json(SavedSearchResponse::from(search)))
}

#[utoipa::path(
    delete,
    path = "/api/saved-searches/{id}",
    params(
        ("id" = Uuid, Path, description = "Saved search ID")
    ),
    responses(
        (status = 200, description = "Saved search soft-deleted"),
        (status = 404, description = "Saved search not found or not owned")
    )
)]
#[axum::debug_handler]
pub async fn delete_saved_search(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    state.saved_search_service.soft_delete(user_id, id).await?;
    Ok(Json(serde_json::json!({ "message": "Saved search deleted" })))
}

#[utoipa::path(
    get,
    path = "/api/saved-searches/{id}/jobs",
    params(
        ("id" = Uuid, Path, description = "Saved search ID"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Jobs currently matching the saved search", body = Json<MatchingJobsResponse>),
        (status = 404, description = "Saved search not found or not owned")
    )
)]
#[axum::debug_handler]
pub async fn get_matching_jobs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Query(query): Query<MatchingJobsQuery>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let search = state.saved_search_service.get_owned(user_id, id).await?;
    let (jobs, total) = state
        .saved_search_service
        .find_matches(&search, page, limit)
        .await?;

    Ok(Json(MatchingJobsResponse {
        jobs,
        total,
        page,
        limit,
    }))
}
