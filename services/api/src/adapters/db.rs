//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `SolutionRepository` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use askpix_core::domain::{Language, NewSavedSolution, SavedSolution, Subject};
use askpix_core::ports::{PortError, PortResult, SolutionRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

const SOLUTION_COLUMNS: &str = "id, user_id, cropped_image, topic, solution, formulas, subject, \
     identified_subject, language, youtube_video_id, youtube_video_thumbnail, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `SolutionRepository` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    max_image_bytes: usize,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool, max_image_bytes: usize) -> Self {
        Self {
            pool,
            max_image_bytes,
        }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(Debug, FromRow)]
struct SavedSolutionRecord {
    id: Uuid,
    #[allow(dead_code)]
    user_id: String,
    cropped_image: Option<String>,
    topic: String,
    solution: String,
    formulas: Option<String>,
    subject: String,
    identified_subject: String,
    language: String,
    youtube_video_id: Option<String>,
    youtube_video_thumbnail: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_column<T: FromStr<Err = String>>(value: &str) -> PortResult<T> {
    value.parse::<T>().map_err(PortError::Unexpected)
}

impl SavedSolutionRecord {
    fn to_domain(self) -> PortResult<SavedSolution> {
        Ok(SavedSolution {
            id: self.id,
            cropped_image: self.cropped_image,
            topic: self.topic,
            solution: self.solution,
            formulas: self.formulas,
            subject: parse_column::<Subject>(&self.subject)?,
            identified_subject: parse_column::<Subject>(&self.identified_subject)?,
            language: parse_column::<Language>(&self.language)?,
            youtube_video_id: self.youtube_video_id,
            youtube_video_thumbnail: self.youtube_video_thumbnail,
            created_at: self.created_at,
        })
    }
}

fn map_db_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound("Solution not found".to_string()),
        // 54000: program_limit_exceeded (row or value too large to store)
        sqlx::Error::Database(db) if db.code().as_deref() == Some("54000") => {
            PortError::PayloadTooLarge
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

//=========================================================================================
// `SolutionRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl SolutionRepository for DbAdapter {
    async fn create(&self, user_id: &str, solution: NewSavedSolution) -> PortResult<SavedSolution> {
        solution.ensure_image_within(self.max_image_bytes)?;

        let query = format!(
            "INSERT INTO saved_solutions (id, user_id, cropped_image, topic, solution, formulas, \
             subject, identified_subject, language, youtube_video_id, youtube_video_thumbnail) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
            SOLUTION_COLUMNS
        );
        let record = sqlx::query_as::<_, SavedSolutionRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&solution.cropped_image)
            .bind(&solution.topic)
            .bind(&solution.solution)
            .bind(&solution.formulas)
            .bind(solution.subject.as_str())
            .bind(solution.identified_subject.as_str())
            .bind(solution.language.code())
            .bind(&solution.youtube_video_id)
            .bind(&solution.youtube_video_thumbnail)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        record.to_domain()
    }

    async fn list(&self, user_id: &str) -> PortResult<Vec<SavedSolution>> {
        let query = format!(
            "SELECT {} FROM saved_solutions WHERE user_id = $1 ORDER BY created_at DESC",
            SOLUTION_COLUMNS
        );
        let records = sqlx::query_as::<_, SavedSolutionRecord>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        records.into_iter().map(SavedSolutionRecord::to_domain).collect()
    }

    async fn delete(&self, user_id: &str, solution_id: Uuid) -> PortResult<()> {
        let deleted = sqlx::query("DELETE FROM saved_solutions WHERE id = $1 AND user_id = $2")
            .bind(solution_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?
            .rows_affected();
        if deleted > 0 {
            return Ok(());
        }

        let owner: Option<String> =
            sqlx::query_scalar("SELECT user_id FROM saved_solutions WHERE id = $1")
                .bind(solution_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_error)?;
        Err(undeleted_error(solution_id, owner.as_deref()))
    }
}

/// Why a delete matched no row: the solution is gone, or it belongs to someone else.
fn undeleted_error(solution_id: Uuid, owner: Option<&str>) -> PortError {
    match owner {
        None => PortError::NotFound(format!("Solution {} not found", solution_id)),
        Some(_) => PortError::PermissionDenied(
            "You don't have permission to delete this solution.".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str) -> SavedSolutionRecord {
        SavedSolutionRecord {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            cropped_image: None,
            topic: "Stoichiometry".to_string(),
            solution: "...".to_string(),
            formulas: None,
            subject: subject.to_string(),
            identified_subject: "Chemistry".to_string(),
            language: "hi".to_string(),
            youtube_video_id: None,
            youtube_video_thumbnail: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn unmatched_deletes_report_missing_or_foreign_rows() {
        let id = Uuid::new_v4();
        assert!(matches!(undeleted_error(id, None), PortError::NotFound(_)));
        assert_eq!(
            undeleted_error(id, Some("user-2")).user_message(),
            "You don't have permission to delete this solution."
        );
    }

    #[test]
    fn records_map_to_domain_values() {
        let saved = record("General").to_domain().unwrap();
        assert_eq!(saved.subject, Subject::General);
        assert_eq!(saved.identified_subject, Subject::Chemistry);
        assert_eq!(saved.language, Language::Hi);
    }

    #[test]
    fn unknown_enum_values_are_reported() {
        assert!(matches!(
            record("Astrology").to_domain(),
            Err(PortError::Unexpected(_))
        ));
    }

    #[test]
    fn missing_rows_map_to_not_found() {
        assert!(matches!(
            map_db_error(sqlx::Error::RowNotFound),
            PortError::NotFound(_)
        ));
    }
}
