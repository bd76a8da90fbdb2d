//! Demo records for local development databases.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::info;

use alumni_portal_core::types::{ActivityKind, EmploymentType};
use alumni_portal_storage::{
    ActivityError, Database, DirectoryError, NewActivity, NewAlumniProfile, NewJobPosting,
    NewUser, UserError,
};

use crate::auth::SessionGuard;

pub const DEMO_USER_ID: &str = "demo-user";
const DEMO_SESSION_TTL_HOURS: i64 = 12;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to seed users: {0}")]
    User(#[from] UserError),
    #[error("failed to seed activities: {0}")]
    Activity(#[from] ActivityError),
    #[error("failed to seed directory: {0}")]
    Directory(#[from] DirectoryError),
    #[error("failed to issue demo session: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Populates an empty database and returns a session token for the demo user.
///
/// Returns `None` without writing anything once any user exists.
pub async fn seed_development_data(
    database: &Database,
    guard: &SessionGuard,
    now: DateTime<Utc>,
) -> Result<Option<String>, SeedError> {
    if !database.users().is_empty().await? {
        return Ok(None);
    }

    database
        .users()
        .insert(&NewUser {
            id: DEMO_USER_ID,
            email: "demo@alumni.example.edu",
            display_name: "Demo Graduate",
            created_at: now,
        })
        .await?;

    database
        .alumni()
        .insert(&NewAlumniProfile {
            id: "demo-profile",
            user_id: DEMO_USER_ID,
            full_name: "Demo Graduate",
            graduation_year: 2018,
            degree: "BSc Computer Science",
            company: Some("Example Labs"),
            job_title: Some("Software Engineer"),
            location: Some("Remote"),
            created_at: now,
        })
        .await?;

    let activities = [
        (ActivityKind::ProfileUpdated, "Updated your alumni profile", 3),
        (ActivityKind::JobApplied, "Applied to Platform Engineer at Example Labs", 26),
        (ActivityKind::EventRsvp, "RSVP'd to the class of 2018 reunion", 72),
    ];
    for (kind, description, hours_ago) in activities {
        database
            .activities()
            .insert(&NewActivity::generated(
                DEMO_USER_ID,
                kind,
                description,
                now - Duration::hours(hours_ago),
            ))
            .await?;
    }

    let jobs = [
        ("demo-job-1", "Platform Engineer", EmploymentType::FullTime, Some(30)),
        ("demo-job-2", "Research Intern", EmploymentType::Internship, None),
    ];
    for (id, title, employment_type, closes_in_days) in jobs {
        database
            .jobs()
            .insert(&NewJobPosting {
                id,
                title,
                company: "Example Labs",
                location: Some("Remote"),
                employment_type,
                description: "Posted by the alumni network",
                posted_by: Some(DEMO_USER_ID),
                posted_at: now - Duration::days(2),
                closes_at: closes_in_days.map(|days| now + Duration::days(days)),
            })
            .await?;
    }

    let token = guard.issue(DEMO_USER_ID, Duration::hours(DEMO_SESSION_TTL_HOURS), now)?;
    info!(stage = "seed", user_id = DEMO_USER_ID, "seeded development data");
    Ok(Some(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    use crate::router::app_router;
    use crate::router::test_support::{get, setup_state};

    #[tokio::test]
    async fn seeded_token_reads_demo_dashboard() {
        let state = setup_state().await;
        let token = seed_development_data(state.storage(), state.guard(), state.now())
            .await
            .expect("seed")
            .expect("token for empty database");

        let (status, body) = get(app_router(state), "/api/dashboard/data", Some(&token)).await;

        assert_eq!(status, StatusCode::OK);
        let activities = body["activities"].as_array().expect("activities array");
        assert_eq!(activities.len(), 3);
        assert_eq!(activities[0]["kind"], "profile_updated");
    }

    #[tokio::test]
    async fn seeding_skips_populated_database() {
        let state = setup_state().await;
        seed_development_data(state.storage(), state.guard(), state.now())
            .await
            .expect("first seed");

        let second = seed_development_data(state.storage(), state.guard(), state.now())
            .await
            .expect("second seed");
        assert!(second.is_none());
    }
}
