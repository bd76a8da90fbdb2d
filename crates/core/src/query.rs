//! Validation of optional list parameters supplied by API callers.
//!
//! Raw parameters are kept as strings so that every malformed value is
//! reported with a caller-facing message instead of an extractor rejection.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

pub const MAX_PAGE_LIMIT: u32 = 100;
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
const MIN_GRADUATION_YEAR: i32 = 1900;
const MAX_GRADUATION_YEAR: i32 = 2100;

/// Query string accepted by the dashboard data endpoint.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DashboardParams {
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub until: Option<String>,
}

/// Query string accepted by the directory listings.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryParams {
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub offset: Option<String>,
    #[serde(default)]
    pub graduation_year: Option<String>,
}

/// Bounds applied when fetching a user's activities.
///
/// `since` is inclusive and `until` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityQuery {
    pub limit: u32,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl ActivityQuery {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            since: None,
            until: None,
        }
    }

    pub fn from_params(params: &DashboardParams, default_limit: u32) -> Result<Self, QueryError> {
        let limit = parse_limit(params.limit.as_deref(), default_limit)?;
        let since = parse_timestamp("since", params.since.as_deref())?;
        let until = parse_timestamp("until", params.until.as_deref())?;

        if let (Some(since), Some(until)) = (since, until) {
            if since > until {
                return Err(QueryError::InvertedRange);
            }
        }

        Ok(Self {
            limit,
            since,
            until,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: u32,
    pub offset: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl PageQuery {
    pub fn from_params(params: &DirectoryParams) -> Result<Self, QueryError> {
        let limit = parse_limit(params.limit.as_deref(), DEFAULT_PAGE_LIMIT)?;
        let offset = match non_blank(params.offset.as_deref()) {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| QueryError::InvalidOffset(raw.to_string()))?,
            None => 0,
        };
        Ok(Self { limit, offset })
    }
}

/// Filters for the alumni directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlumniQuery {
    pub page: PageQuery,
    pub graduation_year: Option<i32>,
}

impl AlumniQuery {
    pub fn from_params(params: &DirectoryParams) -> Result<Self, QueryError> {
        let page = PageQuery::from_params(params)?;
        let graduation_year = match non_blank(params.graduation_year.as_deref()) {
            Some(raw) => {
                let year = raw
                    .parse::<i32>()
                    .map_err(|_| QueryError::InvalidGraduationYear(raw.to_string()))?;
                if !(MIN_GRADUATION_YEAR..=MAX_GRADUATION_YEAR).contains(&year) {
                    return Err(QueryError::InvalidGraduationYear(raw.to_string()));
                }
                Some(year)
            }
            None => None,
        };
        Ok(Self {
            page,
            graduation_year,
        })
    }
}

/// Caller errors in list parameters. Messages are safe to return verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("limit must be an integer between 1 and 100 (got {0})")]
    InvalidLimit(String),
    #[error("offset must be a non-negative integer (got {0})")]
    InvalidOffset(String),
    #[error("{field} must be an RFC 3339 timestamp (got {value})")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("since must not be later than until")]
    InvertedRange,
    #[error("graduationYear must be a year between 1900 and 2100 (got {0})")]
    InvalidGraduationYear(String),
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_limit(raw: Option<&str>, default_limit: u32) -> Result<u32, QueryError> {
    let Some(raw) = non_blank(raw) else {
        return Ok(default_limit.clamp(1, MAX_PAGE_LIMIT));
    };
    match raw.parse::<u32>() {
        Ok(value) if (1..=MAX_PAGE_LIMIT).contains(&value) => Ok(value),
        _ => Err(QueryError::InvalidLimit(raw.to_string())),
    }
}

fn parse_timestamp(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, QueryError> {
    let Some(raw) = non_blank(raw) else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|value| Some(value.with_timezone(&Utc)))
        .map_err(|_| QueryError::InvalidTimestamp {
            field,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dashboard(limit: Option<&str>, since: Option<&str>, until: Option<&str>) -> DashboardParams {
        DashboardParams {
            limit: limit.map(str::to_string),
            since: since.map(str::to_string),
            until: until.map(str::to_string),
        }
    }

    #[test]
    fn missing_params_use_defaults() {
        let query = ActivityQuery::from_params(&DashboardParams::default(), 20).expect("valid");
        assert_eq!(query, ActivityQuery::with_limit(20));
    }

    #[test]
    fn blank_params_are_treated_as_missing() {
        let query = ActivityQuery::from_params(&dashboard(Some(" "), Some(""), None), 15)
            .expect("valid");
        assert_eq!(query, ActivityQuery::with_limit(15));
    }

    #[test]
    fn limit_bounds_are_enforced() {
        for raw in ["0", "101", "-1", "abc"] {
            let err = ActivityQuery::from_params(&dashboard(Some(raw), None, None), 20)
                .expect_err("limit should be rejected");
            assert_eq!(err, QueryError::InvalidLimit(raw.to_string()));
        }
        let query = ActivityQuery::from_params(&dashboard(Some("100"), None, None), 20)
            .expect("upper bound is inclusive");
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn timestamps_are_normalized_to_utc() {
        let query = ActivityQuery::from_params(
            &dashboard(None, Some("2024-03-01T09:00:00+09:00"), None),
            20,
        )
        .expect("valid");
        let since = query.since.expect("since parsed");
        assert_eq!(since.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn invalid_timestamp_names_the_field() {
        let err = ActivityQuery::from_params(&dashboard(None, None, Some("yesterday")), 20)
            .expect_err("until should be rejected");
        assert_eq!(
            err.to_string(),
            "until must be an RFC 3339 timestamp (got yesterday)"
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = ActivityQuery::from_params(
            &dashboard(
                None,
                Some("2024-02-01T00:00:00Z"),
                Some("2024-01-01T00:00:00Z"),
            ),
            20,
        )
        .expect_err("range should be rejected");
        assert_eq!(err, QueryError::InvertedRange);
    }

    #[test]
    fn directory_params_parse_page_and_year() {
        let params = DirectoryParams {
            limit: Some("5".to_string()),
            offset: Some("10".to_string()),
            graduation_year: Some("2015".to_string()),
        };
        let query = AlumniQuery::from_params(&params).expect("valid");
        assert_eq!(query.page, PageQuery { limit: 5, offset: 10 });
        assert_eq!(query.graduation_year, Some(2015));
    }

    #[test]
    fn directory_params_reject_bad_values() {
        let mut params = DirectoryParams {
            offset: Some("-3".to_string()),
            ..DirectoryParams::default()
        };
        assert_eq!(
            PageQuery::from_params(&params),
            Err(QueryError::InvalidOffset("-3".to_string()))
        );

        params.offset = None;
        params.graduation_year = Some("1850".to_string());
        assert_eq!(
            AlumniQuery::from_params(&params),
            Err(QueryError::InvalidGraduationYear("1850".to_string()))
        );
    }
}
