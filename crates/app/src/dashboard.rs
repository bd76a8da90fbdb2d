use std::time::Instant;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    Json,
};
use metrics::{counter, histogram};
use tracing::{debug, error};

use alumni_portal_core::query::{ActivityQuery, DashboardParams};
use alumni_portal_core::shaping::{shape_dashboard, DashboardData};

use crate::auth::{self, AuthOutcome};
use crate::error::ApiError;
use crate::router::AppState;

/// `GET /api/dashboard/data`
///
/// Authentication runs before the query string is looked at, so a caller
/// without a session always receives 401 regardless of its parameters.
pub async fn data(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<DashboardParams>, QueryRejection>,
) -> Result<Json<DashboardData>, ApiError> {
    let start = Instant::now();
    let result = respond(&state, &headers, params).await;

    let label = match &result {
        Ok(_) => "ok",
        Err(err) => err.metric_label(),
    };
    counter!("api_dashboard_requests_total", "result" => label).increment(1);
    histogram!("api_dashboard_latency_seconds").record(start.elapsed().as_secs_f64());

    result.map(Json)
}

async fn respond(
    state: &AppState,
    headers: &HeaderMap,
    params: Result<Query<DashboardParams>, QueryRejection>,
) -> Result<DashboardData, ApiError> {
    let identity = match state.guard().authenticate(headers, state.now()) {
        AuthOutcome::Authorized(identity) => identity,
        AuthOutcome::Rejected(reason) => return Err(auth::reject(reason)),
    };

    let Query(params) = params.map_err(|err| ApiError::bad_request(err.body_text()))?;
    let query = ActivityQuery::from_params(&params, state.dashboard_limit())?;

    let activities = state
        .activities()
        .activities_for_user(&identity.user_id, &query)
        .await
        .map_err(|err| {
            error!(
                stage = "dashboard",
                user_id = %identity.user_id,
                error = %err,
                "failed to load activities"
            );
            ApiError::internal()
        })?;

    let data = shape_dashboard(activities);
    debug!(
        stage = "dashboard",
        user_id = %identity.user_id,
        count = data.activities.len(),
        "dashboard data served"
    );
    Ok(data)
}
