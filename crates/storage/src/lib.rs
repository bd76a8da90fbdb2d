use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use alumni_portal_core::query::{ActivityQuery, AlumniQuery, PageQuery};
use alumni_portal_core::types::{
    Activity, ActivityKind, AlumniProfile, EmploymentType, JobPosting,
};

const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle for interacting with user accounts.
    pub fn users(&self) -> UserRepository {
        UserRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle to read and record dashboard activities.
    pub fn activities(&self) -> ActivityRepository {
        ActivityRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for the alumni directory.
    pub fn alumni(&self) -> AlumniRepository {
        AlumniRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for the job board.
    pub fn jobs(&self) -> JobRepository {
        JobRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read access to a user's activities.
///
/// The HTTP layer depends on this trait rather than on [`ActivityRepository`]
/// so that handlers can be exercised against substitute stores.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn activities_for_user(
        &self,
        user_id: &str,
        query: &ActivityQuery,
    ) -> Result<Vec<Activity>, ActivityError>;
}

/// Repository for user accounts.
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub async fn insert(&self, user: &NewUser<'_>) -> Result<(), UserError> {
        sqlx::query(
            "INSERT INTO users (id, email, display_name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(user.email)
        .bind(user.display_name)
        .bind(to_rfc3339(user.created_at))
        .execute(&self.pool)
        .await
        .map_err(|err| match constraint_code(&err) {
            Some(SQLITE_CONSTRAINT_UNIQUE) | Some(SQLITE_CONSTRAINT_PRIMARYKEY) => {
                UserError::Duplicate
            }
            _ => UserError::Database(err),
        })?;
        Ok(())
    }

    /// Returns `true` when no account has been created yet.
    pub async fn is_empty(&self) -> Result<bool, UserError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count == 0)
    }
}

pub struct NewUser<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub display_name: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("a user with the same id or email already exists")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository responsible for the `activities` table.
#[derive(Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    /// Lists activities owned by `user_id`, newest first.
    ///
    /// Ties on `occurred_at` are broken by ascending id so repeated reads are stable.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        query: &ActivityQuery,
    ) -> Result<Vec<Activity>, ActivityError> {
        let since = query.since.map(window_bound);
        let until = query.until.map(window_bound);
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
SELECT id,
       user_id,
       kind,
       description,
       occurred_at
  FROM activities
 WHERE user_id = ?
   AND (? IS NULL OR occurred_at >= ?)
   AND (? IS NULL OR occurred_at < ?)
 ORDER BY occurred_at DESC, id ASC
 LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(&since)
        .bind(&since)
        .bind(&until)
        .bind(&until)
        .bind(i64::from(query.limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ActivityRow::into_domain).collect())
    }

    /// Records a new activity. Activities are never updated afterwards.
    pub async fn insert(&self, record: &NewActivity<'_>) -> Result<(), ActivityError> {
        sqlx::query(
            "INSERT INTO activities (id, user_id, kind, description, occurred_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.id.as_ref())
        .bind(record.user_id)
        .bind(record.kind.as_str())
        .bind(record.description)
        .bind(to_rfc3339(record.occurred_at))
        .execute(&self.pool)
        .await
        .map_err(|err| match constraint_code(&err) {
            Some(SQLITE_CONSTRAINT_FOREIGNKEY) => ActivityError::MissingUser,
            Some(SQLITE_CONSTRAINT_PRIMARYKEY) => ActivityError::DuplicateId,
            _ => ActivityError::Database(err),
        })?;
        Ok(())
    }
}

#[async_trait]
impl ActivityStore for ActivityRepository {
    async fn activities_for_user(
        &self,
        user_id: &str,
        query: &ActivityQuery,
    ) -> Result<Vec<Activity>, ActivityError> {
        self.list_for_user(user_id, query).await
    }
}

/// Data required to record an activity.
#[derive(Clone)]
pub struct NewActivity<'a> {
    pub id: Cow<'a, str>,
    pub user_id: &'a str,
    pub kind: ActivityKind,
    pub description: &'a str,
    pub occurred_at: DateTime<Utc>,
}

impl<'a> NewActivity<'a> {
    /// Builds a record keyed by a freshly generated id.
    pub fn generated(
        user_id: &'a str,
        kind: ActivityKind,
        description: &'a str,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Cow::Owned(Uuid::new_v4().to_string()),
            user_id,
            kind,
            description,
            occurred_at,
        }
    }

    pub fn with_generated_id(self) -> Self {
        Self {
            id: Cow::Owned(Uuid::new_v4().to_string()),
            ..self
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ActivityRow {
    id: String,
    user_id: String,
    kind: String,
    description: String,
    occurred_at: DateTime<Utc>,
}

impl ActivityRow {
    fn into_domain(self) -> Activity {
        Activity {
            id: self.id,
            user_id: self.user_id,
            kind: ActivityKind::from_db(&self.kind),
            description: self.description,
            occurred_at: self.occurred_at,
        }
    }
}

/// Errors raised by the activity repository.
#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("activity references an unknown user")]
    MissingUser,
    #[error("activity with the same id already exists")]
    DuplicateId,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for alumni directory profiles.
#[derive(Clone)]
pub struct AlumniRepository {
    pool: SqlitePool,
}

impl AlumniRepository {
    /// Lists profiles alphabetically, optionally restricted to one graduating class.
    pub async fn list(&self, query: &AlumniQuery) -> Result<Vec<AlumniProfile>, DirectoryError> {
        let rows = sqlx::query_as::<_, AlumniRow>(
            r#"
SELECT id,
       user_id,
       full_name,
       graduation_year,
       degree,
       company,
       job_title,
       location,
       created_at
  FROM alumni_profiles
 WHERE (? IS NULL OR graduation_year = ?)
 ORDER BY full_name ASC, id ASC
 LIMIT ? OFFSET ?
            "#,
        )
        .bind(query.graduation_year)
        .bind(query.graduation_year)
        .bind(i64::from(query.page.limit))
        .bind(i64::from(query.page.offset))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AlumniRow::into_domain).collect()
    }

    pub async fn insert(&self, profile: &NewAlumniProfile<'_>) -> Result<(), DirectoryError> {
        sqlx::query(
            "INSERT INTO alumni_profiles \
             (id, user_id, full_name, graduation_year, degree, company, job_title, location, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(profile.id)
        .bind(profile.user_id)
        .bind(profile.full_name)
        .bind(profile.graduation_year)
        .bind(profile.degree)
        .bind(profile.company)
        .bind(profile.job_title)
        .bind(profile.location)
        .bind(to_rfc3339(profile.created_at))
        .execute(&self.pool)
        .await
        .map_err(|err| match constraint_code(&err) {
            Some(SQLITE_CONSTRAINT_FOREIGNKEY) => DirectoryError::MissingUser,
            Some(SQLITE_CONSTRAINT_PRIMARYKEY) | Some(SQLITE_CONSTRAINT_UNIQUE) => {
                DirectoryError::Duplicate
            }
            _ => DirectoryError::Database(err),
        })?;
        Ok(())
    }
}

pub struct NewAlumniProfile<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub full_name: &'a str,
    pub graduation_year: i32,
    pub degree: &'a str,
    pub company: Option<&'a str>,
    pub job_title: Option<&'a str>,
    pub location: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct AlumniRow {
    id: String,
    user_id: String,
    full_name: String,
    graduation_year: i64,
    degree: String,
    company: Option<String>,
    job_title: Option<String>,
    location: Option<String>,
    created_at: DateTime<Utc>,
}

impl AlumniRow {
    fn into_domain(self) -> Result<AlumniProfile, DirectoryError> {
        let graduation_year = i32::try_from(self.graduation_year).map_err(|_| {
            DirectoryError::InvalidGraduationYear {
                id: self.id.clone(),
                value: self.graduation_year,
            }
        })?;
        Ok(AlumniProfile {
            id: self.id,
            user_id: self.user_id,
            full_name: self.full_name,
            graduation_year,
            degree: self.degree,
            company: self.company,
            job_title: self.job_title,
            location: self.location,
            created_at: self.created_at,
        })
    }
}

/// Repository for job board postings.
#[derive(Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    /// Lists postings still open at `now`, most recently posted first.
    pub async fn list_open(
        &self,
        now: DateTime<Utc>,
        page: &PageQuery,
    ) -> Result<Vec<JobPosting>, DirectoryError> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
SELECT id,
       title,
       company,
       location,
       employment_type,
       description,
       posted_at,
       closes_at
  FROM job_postings
 WHERE closes_at IS NULL OR closes_at > ?
 ORDER BY posted_at DESC, id ASC
 LIMIT ? OFFSET ?
            "#,
        )
        .bind(to_rfc3339(now))
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(JobRow::into_domain).collect())
    }

    pub async fn insert(&self, job: &NewJobPosting<'_>) -> Result<(), DirectoryError> {
        sqlx::query(
            "INSERT INTO job_postings \
             (id, title, company, location, employment_type, description, posted_by, posted_at, closes_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(job.id)
        .bind(job.title)
        .bind(job.company)
        .bind(job.location)
        .bind(job.employment_type.as_str())
        .bind(job.description)
        .bind(job.posted_by)
        .bind(to_rfc3339(job.posted_at))
        .bind(job.closes_at.map(to_rfc3339))
        .execute(&self.pool)
        .await
        .map_err(|err| match constraint_code(&err) {
            Some(SQLITE_CONSTRAINT_FOREIGNKEY) => DirectoryError::MissingUser,
            Some(SQLITE_CONSTRAINT_PRIMARYKEY) => DirectoryError::Duplicate,
            _ => DirectoryError::Database(err),
        })?;
        Ok(())
    }
}

pub struct NewJobPosting<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub company: &'a str,
    pub location: Option<&'a str>,
    pub employment_type: EmploymentType,
    pub description: &'a str,
    pub posted_by: Option<&'a str>,
    pub posted_at: DateTime<Utc>,
    pub closes_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    title: String,
    company: String,
    location: Option<String>,
    employment_type: String,
    description: String,
    posted_at: DateTime<Utc>,
    closes_at: Option<DateTime<Utc>>,
}

impl JobRow {
    fn into_domain(self) -> JobPosting {
        JobPosting {
            id: self.id,
            title: self.title,
            company: self.company,
            location: self.location,
            employment_type: EmploymentType::from_db(&self.employment_type),
            description: self.description,
            posted_at: self.posted_at,
            closes_at: self.closes_at,
        }
    }
}

/// Errors raised by the directory repositories.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("record references an unknown user")]
    MissingUser,
    #[error("record with the same key already exists")]
    Duplicate,
    #[error("profile {id} has graduation year {value} outside the supported range")]
    InvalidGraduationYear { id: String, value: i64 },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn constraint_code(err: &sqlx::Error) -> Option<&'static str> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    match db_err.code().as_deref() {
        Some(SQLITE_CONSTRAINT_FOREIGNKEY) => Some(SQLITE_CONSTRAINT_FOREIGNKEY),
        Some(SQLITE_CONSTRAINT_PRIMARYKEY) => Some(SQLITE_CONSTRAINT_PRIMARYKEY),
        Some(SQLITE_CONSTRAINT_UNIQUE) => Some(SQLITE_CONSTRAINT_UNIQUE),
        _ => None,
    }
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Formats a range bound for comparison against stored timestamps.
///
/// Stored values carry whole milliseconds, so rounding the bound up keeps
/// `>= since` and `< until` exact for sub-millisecond input.
fn window_bound(value: DateTime<Utc>) -> String {
    let sub_milli = value.timestamp_subsec_nanos() % 1_000_000;
    let rounded = if sub_milli == 0 {
        value
    } else {
        value + Duration::nanoseconds(i64::from(1_000_000 - sub_milli))
    };
    to_rfc3339(rounded)
}
