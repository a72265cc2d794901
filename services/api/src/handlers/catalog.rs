//! Course catalog and situation template endpoints.

use axum::{
    extract::{Path, State},
    response::Json,
};
use oratoria_core::{
    catalog::{Chapter, Course, Situation},
    progress::ProgressStore,
    template::SituationTemplate,
};
use std::sync::Arc;

use super::ApiError;
use crate::{
    auth::AuthUser,
    extractors::JsonBody,
    models::{
        CourseDetail, CourseSummary, ErrorResponse, ResolveTemplatePayload, SituationResponse,
    },
    state::AppState,
};

/// Whether the user may read the content of `course`. Open courses are
/// readable by everyone; enrollable ones only by enrolled users.
pub async fn has_course_access(
    state: &AppState,
    user_id: &str,
    course: &Course,
) -> Result<bool, ApiError> {
    if !course.enrollable {
        return Ok(true);
    }
    Ok(state.store.is_enrolled(user_id, &course.id).await?)
}

pub async fn ensure_course_access(
    state: &AppState,
    user_id: &str,
    course: &Course,
) -> Result<(), ApiError> {
    if has_course_access(state, user_id, course).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "Enroll in course '{}' to access its content",
            course.id
        )))
    }
}

/// List all courses.
#[utoipa::path(
    get,
    path = "/api/courses",
    responses(
        (status = 200, description = "All courses, without situation details", body = [CourseSummary]),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
) -> Json<Vec<CourseSummary>> {
    Json(state.catalog.courses().iter().map(CourseSummary::from).collect())
}

/// Get a course outline and whether the caller can open its chapters.
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    responses(
        (status = 200, description = "Course outline", body = CourseDetail),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Course ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CourseDetail>, ApiError> {
    let course = state.catalog.course(&id).map_err(ApiError::from_catalog)?;
    let has_access = has_course_access(&state, &user_id, course).await?;
    Ok(Json(CourseDetail {
        course: CourseSummary::from(course),
        has_access,
    }))
}

/// Get a chapter with all of its situations.
#[utoipa::path(
    get,
    path = "/api/courses/{id}/chapters/{chapter_id}",
    responses(
        (status = 200, description = "Chapter details", body = Chapter),
        (status = 403, description = "Not enrolled in the course", body = ErrorResponse),
        (status = 404, description = "Course or chapter not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Course ID"),
        ("chapter_id" = String, Path, description = "Chapter ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn get_chapter(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path((id, chapter_id)): Path<(String, String)>,
) -> Result<Json<Chapter>, ApiError> {
    let chapter = state
        .catalog
        .chapter(&id, &chapter_id)
        .map_err(ApiError::from_catalog)?;
    let course = state.catalog.course(&id).map_err(ApiError::from_catalog)?;
    ensure_course_access(&state, &user_id, course).await?;
    Ok(Json(chapter.clone()))
}

/// Get a single situation.
#[utoipa::path(
    get,
    path = "/api/courses/{id}/chapters/{chapter_id}/situations/{situation_id}",
    responses(
        (status = 200, description = "Situation details", body = SituationResponse),
        (status = 403, description = "Not enrolled in the course", body = ErrorResponse),
        (status = 404, description = "Course, chapter or situation not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Course ID"),
        ("chapter_id" = String, Path, description = "Chapter ID"),
        ("situation_id" = String, Path, description = "Situation ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn get_situation(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path((id, chapter_id, situation_id)): Path<(String, String, String)>,
) -> Result<Json<SituationResponse>, ApiError> {
    let situation = state
        .catalog
        .situation(&id, &chapter_id, &situation_id)
        .map_err(ApiError::from_catalog)?;
    let course = state.catalog.course(&id).map_err(ApiError::from_catalog)?;
    ensure_course_access(&state, &user_id, course).await?;
    Ok(Json(SituationResponse {
        course_id: id,
        chapter_id,
        situation: situation.clone(),
    }))
}

/// List the situation templates users can customize.
#[utoipa::path(
    get,
    path = "/api/templates",
    responses(
        (status = 200, description = "All situation templates", body = [SituationTemplate])
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
) -> Json<Vec<SituationTemplate>> {
    Json(state.catalog.templates().to_vec())
}

/// Fill a template's variables and get the resulting situation.
#[utoipa::path(
    post,
    path = "/api/templates/{id}/resolve",
    request_body = ResolveTemplatePayload,
    responses(
        (status = 200, description = "The resolved situation", body = Situation),
        (status = 404, description = "Template not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Template ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn resolve_template(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<ResolveTemplatePayload>,
) -> Result<Json<Situation>, ApiError> {
    let template = state.catalog.template(&id).map_err(ApiError::from_catalog)?;
    Ok(Json(template.resolve(&payload.variables, payload.difficulty)))
}
