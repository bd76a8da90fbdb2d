//! Conversion of domain records into the JSON contract served to clients.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::types::{Activity, ActivityKind, AlumniProfile, EmploymentType, JobPosting};

/// Body of `GET /api/dashboard/data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardData {
    pub activities: Vec<ActivityView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub id: String,
    pub kind: ActivityKind,
    pub description: String,
    pub occurred_at: String,
}

impl From<Activity> for ActivityView {
    fn from(activity: Activity) -> Self {
        Self {
            id: activity.id,
            kind: activity.kind,
            description: activity.description,
            occurred_at: format_timestamp(activity.occurred_at),
        }
    }
}

/// Shapes a user's activities, keeping the store's order.
///
/// Records without an identifier are dropped.
pub fn shape_dashboard(activities: Vec<Activity>) -> DashboardData {
    let activities = activities
        .into_iter()
        .filter(|activity| !activity.id.trim().is_empty())
        .map(ActivityView::from)
        .collect();
    DashboardData { activities }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlumniDirectory {
    pub alumni: Vec<AlumniView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlumniView {
    pub id: String,
    pub full_name: String,
    pub graduation_year: i32,
    pub degree: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl From<AlumniProfile> for AlumniView {
    fn from(profile: AlumniProfile) -> Self {
        Self {
            id: profile.id,
            full_name: profile.full_name,
            graduation_year: profile.graduation_year,
            degree: profile.degree,
            company: profile.company,
            job_title: profile.job_title,
            location: profile.location,
        }
    }
}

pub fn shape_alumni(profiles: Vec<AlumniProfile>) -> AlumniDirectory {
    AlumniDirectory {
        alumni: profiles.into_iter().map(AlumniView::from).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobBoard {
    pub jobs: Vec<JobView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub employment_type: EmploymentType,
    pub description: String,
    pub posted_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closes_at: Option<String>,
}

impl From<JobPosting> for JobView {
    fn from(job: JobPosting) -> Self {
        Self {
            id: job.id,
            title: job.title,
            company: job.company,
            location: job.location,
            employment_type: job.employment_type,
            description: job.description,
            posted_at: format_timestamp(job.posted_at),
            closes_at: job.closes_at.map(format_timestamp),
        }
    }
}

pub fn shape_jobs(jobs: Vec<JobPosting>) -> JobBoard {
    JobBoard {
        jobs: jobs.into_iter().map(JobView::from).collect(),
    }
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
