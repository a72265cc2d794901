//! Enrollment & Progress Store
//!
//! Enrollments are (user, course) pairs whose existence grants access to an
//! enrollable course. Lesson progress is at most one record per
//! (user, lesson), written by upsert.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::catalog::Course;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Enrollment {
    pub user_id: String,
    pub course_id: String,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LessonProgress {
    pub user_id: String,
    pub lesson_id: String,
    pub completed: bool,
    pub completion_percentage: i32,
    /// Id of the situation the user last practiced in this lesson.
    pub current_stage: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Course-level aggregate computed from lesson progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CourseProgress {
    pub course_id: String,
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub percentage: u8,
    pub lessons: Vec<LessonProgress>,
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Enrolls the user. Enrolling twice leaves exactly one enrollment.
    async fn enroll(&self, user_id: &str, course_id: &str) -> Result<Enrollment>;

    /// Removes the enrollment, returning whether one existed. Lesson progress
    /// is kept.
    async fn unenroll(&self, user_id: &str, course_id: &str) -> Result<bool>;

    async fn is_enrolled(&self, user_id: &str, course_id: &str) -> Result<bool>;

    async fn list_enrollments(&self, user_id: &str) -> Result<Vec<Enrollment>>;

    /// Upserts the lesson as completed and refreshes its last-accessed time.
    async fn mark_lesson_complete(&self, user_id: &str, lesson_id: &str)
    -> Result<LessonProgress>;

    /// Upserts the lesson's current stage and last-accessed time, leaving its
    /// completion untouched.
    async fn record_lesson_access(
        &self,
        user_id: &str,
        lesson_id: &str,
        stage: Option<&str>,
    ) -> Result<LessonProgress>;

    async fn lesson_progress(&self, user_id: &str, lesson_id: &str)
    -> Result<Option<LessonProgress>>;

    async fn lessons_progress(
        &self,
        user_id: &str,
        lesson_ids: &[String],
    ) -> Result<Vec<LessonProgress>>;
}

/// Aggregates a user's lesson progress over every lesson of a course.
pub async fn course_progress<S>(store: &S, user_id: &str, course: &Course) -> Result<CourseProgress>
where
    S: ProgressStore + ?Sized,
{
    let lesson_ids: Vec<String> = course.lesson_ids().map(str::to_string).collect();
    let lessons = store.lessons_progress(user_id, &lesson_ids).await?;
    let total_lessons = lesson_ids.len();
    let completed_lessons = lessons.iter().filter(|l| l.completed).count();
    let percentage = if total_lessons == 0 {
        0
    } else {
        (completed_lessons * 100 / total_lessons) as u8
    };

    Ok(CourseProgress {
        course_id: course.id.clone(),
        total_lessons,
        completed_lessons,
        percentage,
        lessons,
    })
}
