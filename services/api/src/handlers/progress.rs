//! Enrollment and lesson progress endpoints.

use axum::{
    extract::{Path, State},
    response::Json,
};
use oratoria_core::{
    catalog::{Chapter, Course},
    progress::{CourseProgress, Enrollment, LessonProgress, ProgressStore, course_progress},
};
use std::sync::Arc;
use tracing::info;

use super::{ApiError, catalog::ensure_course_access};
use crate::{
    auth::AuthUser,
    extractors::JsonBody,
    models::{EnrollmentStatus, ErrorResponse, LessonAccessPayload},
    state::AppState,
};

/// Finds a lesson (chapter) and its course in the catalog.
fn find_lesson<'a>(
    state: &'a AppState,
    lesson_id: &str,
) -> Result<(&'a Course, &'a Chapter), ApiError> {
    state
        .catalog
        .lesson_course(lesson_id)
        .and_then(|course| {
            course
                .chapters
                .iter()
                .find(|c| c.id == lesson_id)
                .map(|chapter| (course, chapter))
        })
        .ok_or_else(|| ApiError::NotFound(format!("Lesson '{lesson_id}' not found")))
}

/// Enroll in a course. Enrolling again is a no-op.
#[utoipa::path(
    post,
    path = "/api/courses/{id}/enrollment",
    responses(
        (status = 200, description = "Enrolled", body = EnrollmentStatus),
        (status = 400, description = "Course is open and takes no enrollments", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Course ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<EnrollmentStatus>, ApiError> {
    let course = state.catalog.course(&id).map_err(ApiError::from_catalog)?;
    if !course.enrollable {
        return Err(ApiError::BadRequest(format!(
            "Course '{id}' is open to everyone and takes no enrollments"
        )));
    }
    state.store.enroll(&user_id, &course.id).await?;
    info!(%user_id, course_id = %course.id, "User enrolled");
    Ok(Json(EnrollmentStatus {
        course_id: id,
        enrolled: true,
    }))
}

/// Leave a course. Lesson progress is kept.
#[utoipa::path(
    delete,
    path = "/api/courses/{id}/enrollment",
    responses(
        (status = 200, description = "Not enrolled anymore", body = EnrollmentStatus),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Course ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn unenroll(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<EnrollmentStatus>, ApiError> {
    let course = state.catalog.course(&id).map_err(ApiError::from_catalog)?;
    if state.store.unenroll(&user_id, &course.id).await? {
        info!(%user_id, course_id = %course.id, "User unenrolled");
    }
    Ok(Json(EnrollmentStatus {
        course_id: id,
        enrolled: false,
    }))
}

/// List the caller's enrollments, oldest first.
#[utoipa::path(
    get,
    path = "/api/enrollments",
    responses(
        (status = 200, description = "Enrollments", body = [Enrollment])
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn list_enrollments(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Enrollment>>, ApiError> {
    Ok(Json(state.store.list_enrollments(&user_id).await?))
}

/// Get the caller's progress through a course.
#[utoipa::path(
    get,
    path = "/api/courses/{id}/progress",
    responses(
        (status = 200, description = "Course progress", body = CourseProgress),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Course ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn get_course_progress(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CourseProgress>, ApiError> {
    let course = state.catalog.course(&id).map_err(ApiError::from_catalog)?;
    let progress = course_progress(state.store.as_ref(), &user_id, course).await?;
    Ok(Json(progress))
}

/// Mark a lesson as completed.
#[utoipa::path(
    post,
    path = "/api/lessons/{id}/complete",
    responses(
        (status = 200, description = "Updated lesson progress", body = LessonProgress),
        (status = 403, description = "Not enrolled in the lesson's course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Lesson (chapter) ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn complete_lesson(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<LessonProgress>, ApiError> {
    let (course, _) = find_lesson(&state, &id)?;
    ensure_course_access(&state, &user_id, course).await?;
    let progress = state.store.mark_lesson_complete(&user_id, &id).await?;
    info!(%user_id, lesson_id = %id, "Lesson completed");
    Ok(Json(progress))
}

/// Record that the caller opened a lesson, optionally at a given situation.
/// The body may be omitted.
#[utoipa::path(
    post,
    path = "/api/lessons/{id}/access",
    request_body = LessonAccessPayload,
    responses(
        (status = 200, description = "Updated lesson progress", body = LessonProgress),
        (status = 400, description = "Stage is not part of the lesson", body = ErrorResponse),
        (status = 403, description = "Not enrolled in the lesson's course", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Lesson (chapter) ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn record_lesson_access(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    payload: Option<JsonBody<LessonAccessPayload>>,
) -> Result<Json<LessonProgress>, ApiError> {
    let stage = payload.and_then(|JsonBody(payload)| payload.stage);
    let (course, chapter) = find_lesson(&state, &id)?;
    if let Some(stage) = stage.as_deref() {
        if !chapter.situations.iter().any(|s| s.id == stage) {
            return Err(ApiError::BadRequest(format!(
                "Situation '{stage}' is not part of lesson '{id}'"
            )));
        }
    }
    ensure_course_access(&state, &user_id, course).await?;
    let progress = state
        .store
        .record_lesson_access(&user_id, &id, stage.as_deref())
        .await?;
    Ok(Json(progress))
}

/// Get the caller's progress on a single lesson.
#[utoipa::path(
    get,
    path = "/api/lessons/{id}/progress",
    responses(
        (status = 200, description = "Lesson progress", body = LessonProgress),
        (status = 404, description = "Lesson not found or never opened", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Lesson (chapter) ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn get_lesson_progress(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<LessonProgress>, ApiError> {
    find_lesson(&state, &id)?;
    state
        .store
        .lesson_progress(&user_id, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No progress recorded for lesson '{id}'")))
}
