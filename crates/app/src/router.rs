use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use alumni_portal_storage::{ActivityStore, Database};

use crate::auth::SessionGuard;
use crate::{dashboard, directory, telemetry};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    storage: Database,
    activities: Arc<dyn ActivityStore>,
    guard: SessionGuard,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    dashboard_limit: u32,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        storage: Database,
        guard: SessionGuard,
        dashboard_limit: u32,
    ) -> Self {
        let activities: Arc<dyn ActivityStore> = Arc::new(storage.activities());
        Self {
            metrics,
            storage,
            activities,
            guard,
            clock: Arc::new(Utc::now),
            dashboard_limit,
        }
    }

    /// Replaces the store the dashboard reads activities from.
    #[cfg(test)]
    pub fn with_activity_store(mut self, store: Arc<dyn ActivityStore>) -> Self {
        self.activities = store;
        self
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn storage(&self) -> &Database {
        &self.storage
    }

    pub fn activities(&self) -> &dyn ActivityStore {
        self.activities.as_ref()
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn dashboard_limit(&self) -> u32 {
        self.dashboard_limit
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/api/dashboard/data", get(dashboard::data))
        .route("/api/alumni", get(directory::alumni))
        .route("/api/jobs", get(directory::jobs))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        Body::from(body),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::http::Request;
    use chrono::Duration;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use alumni_portal_storage::NewUser;

    pub const SESSION_SECRET: &[u8] = b"test-session-secret";
    pub const FIXED_NOW: &str = "2024-06-01T12:00:00Z";

    pub fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(FIXED_NOW)
            .expect("fixed time")
            .with_timezone(&Utc)
    }

    pub async fn setup_state() -> AppState {
        let metrics = telemetry::init_metrics().expect("metrics init");
        let database = Database::connect("sqlite::memory:?cache=shared")
            .await
            .expect("connect");
        database.run_migrations().await.expect("migrations");

        AppState::new(metrics, database, SessionGuard::new(SESSION_SECRET), 20)
            .with_clock(Arc::new(fixed_now))
    }

    pub async fn insert_user(state: &AppState, id: &str) {
        state
            .storage()
            .users()
            .insert(&NewUser {
                id,
                email: &format!("{id}@example.edu"),
                display_name: id,
                created_at: fixed_now(),
            })
            .await
            .expect("insert user");
    }

    pub fn token_for(state: &AppState, user_id: &str) -> String {
        state
            .guard()
            .issue(user_id, Duration::hours(1), state.now())
            .expect("issue token")
    }

    pub async fn get(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .expect("handler should respond");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should read")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }
}
