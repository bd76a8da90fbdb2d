use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    Json,
};
use metrics::counter;
use tracing::error;

use alumni_portal_core::query::{AlumniQuery, DirectoryParams, PageQuery};
use alumni_portal_core::shaping::{shape_alumni, shape_jobs, AlumniDirectory, JobBoard};

use crate::auth::{self, AuthOutcome};
use crate::error::ApiError;
use crate::router::AppState;

/// `GET /api/alumni`, visible to signed-in members only.
pub async fn alumni(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<DirectoryParams>, QueryRejection>,
) -> Result<Json<AlumniDirectory>, ApiError> {
    let result = list_alumni(&state, &headers, params).await;
    record("alumni", &result);
    result.map(Json)
}

async fn list_alumni(
    state: &AppState,
    headers: &HeaderMap,
    params: Result<Query<DirectoryParams>, QueryRejection>,
) -> Result<AlumniDirectory, ApiError> {
    if let AuthOutcome::Rejected(reason) = state.guard().authenticate(headers, state.now()) {
        return Err(auth::reject(reason));
    }

    let Query(params) = params.map_err(|err| ApiError::bad_request(err.body_text()))?;
    let query = AlumniQuery::from_params(&params)?;

    let profiles = state.storage().alumni().list(&query).await.map_err(|err| {
        error!(stage = "directory", error = %err, "failed to list alumni");
        ApiError::internal()
    })?;
    Ok(shape_alumni(profiles))
}

/// `GET /api/jobs`, public listing of postings that are still open.
pub async fn jobs(
    State(state): State<AppState>,
    params: Result<Query<DirectoryParams>, QueryRejection>,
) -> Result<Json<JobBoard>, ApiError> {
    let result = list_jobs(&state, params).await;
    record("jobs", &result);
    result.map(Json)
}

async fn list_jobs(
    state: &AppState,
    params: Result<Query<DirectoryParams>, QueryRejection>,
) -> Result<JobBoard, ApiError> {
    let Query(params) = params.map_err(|err| ApiError::bad_request(err.body_text()))?;
    let page = PageQuery::from_params(&params)?;

    let postings = state
        .storage()
        .jobs()
        .list_open(state.now(), &page)
        .await
        .map_err(|err| {
            error!(stage = "directory", error = %err, "failed to list jobs");
            ApiError::internal()
        })?;
    Ok(shape_jobs(postings))
}

fn record<T>(endpoint: &'static str, result: &Result<T, ApiError>) {
    let label = match result {
        Ok(_) => "ok",
        Err(err) => err.metric_label(),
    };
    counter!("api_directory_requests_total", "endpoint" => endpoint, "result" => label)
        .increment(1);
}
