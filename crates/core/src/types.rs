use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dashboard-visible event recorded for a single user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub kind: ActivityKind,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

/// Category of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ProfileUpdated,
    JobPosted,
    JobApplied,
    ConnectionMade,
    EventRsvp,
    Other,
}

impl ActivityKind {
    /// Returns the canonical database representation for the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProfileUpdated => "profile_updated",
            Self::JobPosted => "job_posted",
            Self::JobApplied => "job_applied",
            Self::ConnectionMade => "connection_made",
            Self::EventRsvp => "event_rsvp",
            Self::Other => "other",
        }
    }

    /// Maps a stored value back to a kind. Unknown values become [`ActivityKind::Other`].
    pub fn from_db(value: &str) -> Self {
        match value {
            "profile_updated" => Self::ProfileUpdated,
            "job_posted" => Self::JobPosted,
            "job_applied" => Self::JobApplied,
            "connection_made" => Self::ConnectionMade,
            "event_rsvp" => Self::EventRsvp,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory entry describing a graduate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlumniProfile {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub graduation_year: i32,
    pub degree: String,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Job board posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub employment_type: EmploymentType,
    pub description: String,
    pub posted_at: DateTime<Utc>,
    pub closes_at: Option<DateTime<Utc>>,
}

impl JobPosting {
    /// A posting accepts applications until its closing time, when one is set.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.closes_at.map(|closes| closes > now).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

impl EmploymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullTime => "full_time",
            Self::PartTime => "part_time",
            Self::Contract => "contract",
            Self::Internship => "internship",
        }
    }

    /// Unknown stored values fall back to full time.
    pub fn from_db(value: &str) -> Self {
        match value {
            "part_time" => Self::PartTime,
            "contract" => Self::Contract,
            "internship" => Self::Internship,
            _ => Self::FullTime,
        }
    }
}
