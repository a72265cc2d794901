//! Data Access Layer
//!
//! This module contains all the functions for interacting with the PostgreSQL database.
//! It implements the core `ProgressStore` and `UserStore` traits on top of `sqlx`
//! connection pooling.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oratoria_core::{
    catalog::Catalog,
    progress::{Enrollment, LessonProgress, ProgressStore},
    users::{UserProfile, UserStore},
};
use sqlx::{FromRow, PgPool};
use tracing::info;

/// A wrapper around the `PgPool` to provide a clear data access interface.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

#[derive(FromRow)]
struct EnrollmentRow {
    user_id: String,
    course_id: String,
    enrolled_at: DateTime<Utc>,
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        Self {
            user_id: row.user_id,
            course_id: row.course_id,
            enrolled_at: row.enrolled_at,
        }
    }
}

#[derive(FromRow)]
struct LessonProgressRow {
    user_id: String,
    lesson_id: String,
    completed: bool,
    completion_percentage: i32,
    current_stage: Option<String>,
    started_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<LessonProgressRow> for LessonProgress {
    fn from(row: LessonProgressRow) -> Self {
        Self {
            user_id: row.user_id,
            lesson_id: row.lesson_id,
            completed: row.completed,
            completion_percentage: row.completion_percentage,
            current_stage: row.current_stage,
            started_at: row.started_at,
            last_accessed_at: row.last_accessed_at,
            completed_at: row.completed_at,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    onboarded: bool,
    free_conversations_used: i32,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            user_id: row.id,
            onboarded: row.onboarded,
            free_conversations_used: row.free_conversations_used.max(0) as u32,
        }
    }
}

const LESSON_PROGRESS_COLUMNS: &str = "user_id, lesson_id, completed, completion_percentage, \
     current_stage, started_at, last_accessed_at, completed_at";

/// Upserts the enrollment and returns the stored row from the same statement.
const ENROLL_SQL: &str = "INSERT INTO course_enrollments (user_id, course_id) VALUES ($1, $2)
     ON CONFLICT (user_id, course_id) DO UPDATE SET user_id = EXCLUDED.user_id
     RETURNING user_id, course_id, enrolled_at";

/// Increments only while under the limit; a limit of 0 never blocks.
const RECORD_CONVERSATION_SQL: &str = "UPDATE users
     SET free_conversations_used = free_conversations_used + 1, updated_at = NOW()
     WHERE id = $1 AND ($2 = 0 OR free_conversations_used < $2)
     RETURNING free_conversations_used";

impl Db {
    /// Creates a new `Db` instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Mirrors the static catalog into the catalog tables in a single transaction,
    /// so enrollment and progress rows can reference courses and lessons.
    pub async fn sync_catalog(&self, catalog: &Catalog) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for course in catalog.courses() {
            let category_id = course.category.to_lowercase().replace(' ', "-");
            sqlx::query(
                "INSERT INTO categories (id, name) VALUES ($1, $2)
                 ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
            )
            .bind(&category_id)
            .bind(&course.category)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO courses (id, category_id, title, description, color, icon, enrollable)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (id) DO UPDATE SET
                    category_id = EXCLUDED.category_id,
                    title = EXCLUDED.title,
                    description = EXCLUDED.description,
                    color = EXCLUDED.color,
                    icon = EXCLUDED.icon,
                    enrollable = EXCLUDED.enrollable",
            )
            .bind(&course.id)
            .bind(&category_id)
            .bind(&course.title)
            .bind(&course.description)
            .bind(&course.color)
            .bind(&course.icon)
            .bind(course.enrollable)
            .execute(&mut *tx)
            .await?;

            for chapter in &course.chapters {
                sqlx::query(
                    "INSERT INTO lessons (id, course_id, title, description, order_index)
                     VALUES ($1, $2, $3, $4, $5)
                     ON CONFLICT (id) DO UPDATE SET
                        course_id = EXCLUDED.course_id,
                        title = EXCLUDED.title,
                        description = EXCLUDED.description,
                        order_index = EXCLUDED.order_index",
                )
                .bind(&chapter.id)
                .bind(&course.id)
                .bind(&chapter.title)
                .bind(&chapter.description)
                .bind(chapter.order as i32)
                .execute(&mut *tx)
                .await?;

                for (index, situation) in chapter.situations.iter().enumerate() {
                    sqlx::query(
                        "INSERT INTO lesson_stages (id, lesson_id, title, difficulty, order_index)
                         VALUES ($1, $2, $3, $4, $5)
                         ON CONFLICT (id) DO UPDATE SET
                            lesson_id = EXCLUDED.lesson_id,
                            title = EXCLUDED.title,
                            difficulty = EXCLUDED.difficulty,
                            order_index = EXCLUDED.order_index",
                    )
                    .bind(&situation.id)
                    .bind(&chapter.id)
                    .bind(&situation.title)
                    .bind(situation.difficulty.to_string())
                    .bind(index as i32)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;
        info!(courses = catalog.courses().len(), "Catalog synchronized");
        Ok(())
    }

    async fn ensure_user(&self, user_id: &str) -> Result<()> {
        sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for Db {
    async fn enroll(&self, user_id: &str, course_id: &str) -> Result<Enrollment> {
        let row = sqlx::query_as::<_, EnrollmentRow>(ENROLL_SQL)
            .bind(user_id)
            .bind(course_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn unenroll(&self, user_id: &str, course_id: &str) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM course_enrollments WHERE user_id = $1 AND course_id = $2")
                .bind(user_id)
                .bind(course_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_enrolled(&self, user_id: &str, course_id: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM course_enrollments WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_enrollments(&self, user_id: &str) -> Result<Vec<Enrollment>> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            "SELECT user_id, course_id, enrolled_at FROM course_enrollments
             WHERE user_id = $1 ORDER BY enrolled_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_lesson_complete(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<LessonProgress> {
        let row = sqlx::query_as::<_, LessonProgressRow>(&format!(
            "INSERT INTO lesson_progress
                (user_id, lesson_id, completed, completion_percentage, completed_at)
             VALUES ($1, $2, TRUE, 100, NOW())
             ON CONFLICT (user_id, lesson_id) DO UPDATE SET
                completed = TRUE,
                completion_percentage = 100,
                last_accessed_at = NOW(),
                completed_at = COALESCE(lesson_progress.completed_at, NOW())
             RETURNING {LESSON_PROGRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(lesson_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn record_lesson_access(
        &self,
        user_id: &str,
        lesson_id: &str,
        stage: Option<&str>,
    ) -> Result<LessonProgress> {
        let row = sqlx::query_as::<_, LessonProgressRow>(&format!(
            "INSERT INTO lesson_progress (user_id, lesson_id, current_stage)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, lesson_id) DO UPDATE SET
                current_stage = COALESCE(EXCLUDED.current_stage, lesson_progress.current_stage),
                last_accessed_at = NOW()
             RETURNING {LESSON_PROGRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(lesson_id)
        .bind(stage)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn lesson_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<LessonProgress>> {
        let row = sqlx::query_as::<_, LessonProgressRow>(&format!(
            "SELECT {LESSON_PROGRESS_COLUMNS} FROM lesson_progress
             WHERE user_id = $1 AND lesson_id = $2"
        ))
        .bind(user_id)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn lessons_progress(
        &self,
        user_id: &str,
        lesson_ids: &[String],
    ) -> Result<Vec<LessonProgress>> {
        let rows = sqlx::query_as::<_, LessonProgressRow>(&format!(
            "SELECT {LESSON_PROGRESS_COLUMNS} FROM lesson_progress
             WHERE user_id = $1 AND lesson_id = ANY($2)
             ORDER BY started_at ASC"
        ))
        .bind(user_id)
        .bind(lesson_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl UserStore for Db {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, onboarded, free_conversations_used FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn complete_onboarding(&self, user_id: &str) -> Result<UserProfile> {
        self.ensure_user(user_id).await?;
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET onboarded = TRUE, updated_at = NOW() WHERE id = $1
             RETURNING id, onboarded, free_conversations_used",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn record_conversation(&self, user_id: &str, limit: u32) -> Result<Option<u32>> {
        self.ensure_user(user_id).await?;
        let used: Option<i32> = sqlx::query_scalar(RECORD_CONVERSATION_SQL)
            .bind(user_id)
            .bind(i64::from(limit))
            .fetch_optional(&self.pool)
            .await?;
        Ok(used.map(|used| used.max(0) as u32))
    }
}
