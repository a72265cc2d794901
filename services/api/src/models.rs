//! API Models
//!
//! Request and response bodies for the REST API. Domain types (courses,
//! feedback, progress records) come from `oratoria-core` and are re-used
//! directly; this module only adds the HTTP-specific envelopes.

use oratoria_core::{
    catalog::{Chapter, Course, Difficulty, Situation},
    feedback::FeedbackRequest,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversationAction {
    /// Requests credentials for a new voice vendor conversation.
    Start,
    /// Requests feedback for a finished transcript.
    Feedback,
}

/// Body of `POST /api/conversation`. `data` is only read for `feedback`,
/// where it must be a `FeedbackRequest`.
#[derive(Deserialize, ToSchema, Debug)]
pub struct ConversationRequest {
    #[serde(rename = "type")]
    pub action: ConversationAction,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
}

impl ConversationRequest {
    /// Extracts the feedback request carried in `data`.
    pub fn feedback_request(self) -> Result<FeedbackRequest, String> {
        let data = self
            .data
            .ok_or_else(|| "data is required for feedback requests".to_string())?;
        serde_json::from_value(data).map_err(|e| format!("Invalid feedback request: {e}"))
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CoachResponse {
    pub feedback: String,
}

#[derive(Deserialize, ToSchema, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidateKeysPayload {
    #[serde(default)]
    pub eleven_labs_key: String,
    #[serde(default)]
    pub fal_ai_key: String,
}

#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct ResolveTemplatePayload {
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct LessonAccessPayload {
    /// The situation the user is currently working through.
    #[schema(example = "salary-raise")]
    #[serde(default)]
    pub stage: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStatus {
    pub course_id: String,
    pub enrolled: bool,
}

/// Free-conversation usage for the calling user. `limit` and `remaining` are
/// absent when usage is unlimited.
#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct UsageResponse {
    pub used: u32,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
}

impl UsageResponse {
    pub fn new(used: u32, limit: u32) -> Self {
        if limit == 0 {
            return Self {
                used,
                limit: None,
                remaining: None,
            };
        }
        Self {
            used,
            limit: Some(limit),
            remaining: Some(limit.saturating_sub(used)),
        }
    }
}

/// A chapter without its situations.
#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterOutline {
    pub id: String,
    pub title: String,
    pub description: String,
    pub order: u32,
    pub situation_count: usize,
}

impl From<&Chapter> for ChapterOutline {
    fn from(chapter: &Chapter) -> Self {
        Self {
            id: chapter.id.clone(),
            title: chapter.title.clone(),
            description: chapter.description.clone(),
            order: chapter.order,
            situation_count: chapter.situations.len(),
        }
    }
}

/// What a course looks like before the caller has access to its content.
#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub color: String,
    pub icon: String,
    pub enrollable: bool,
    pub chapters: Vec<ChapterOutline>,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.clone(),
            title: course.title.clone(),
            description: course.description.clone(),
            category: course.category.clone(),
            color: course.color.clone(),
            icon: course.icon.clone(),
            enrollable: course.enrollable,
            chapters: course.chapters.iter().map(ChapterOutline::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: CourseSummary,
    /// Always true for courses that are open to everyone.
    pub has_access: bool,
}

/// A situation together with the course it belongs to.
#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SituationResponse {
    pub course_id: String,
    pub chapter_id: String,
    pub situation: Situation,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use oratoria_core::conversation::MessageSource;

    #[test]
    fn test_conversation_start_without_data() {
        let request: ConversationRequest = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert_eq!(request.action, ConversationAction::Start);
        assert!(request.data.is_none());
    }

    #[test]
    fn test_conversation_feedback_payload() {
        let json = r#"{
            "type": "feedback",
            "data": {
                "messages": [{"source": "user", "text": "Hi"}],
                "context": "A coffee shop",
                "userGoal": "Order politely",
                "aiRole": "Barista"
            }
        }"#;
        let request: ConversationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.action, ConversationAction::Feedback);
        let req = request.feedback_request().unwrap();
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].source, MessageSource::User);
        assert_eq!(req.user_goal, "Order politely");
    }

    #[test]
    fn test_conversation_feedback_requires_data() {
        let request: ConversationRequest =
            serde_json::from_str(r#"{"type":"feedback"}"#).unwrap();
        assert!(request.feedback_request().is_err());

        let request: ConversationRequest =
            serde_json::from_str(r#"{"type":"feedback","data":{"messages":[]}}"#).unwrap();
        assert!(request.feedback_request().is_err());
    }

    #[test]
    fn test_conversation_unknown_type_is_rejected() {
        let result: Result<ConversationRequest, _> =
            serde_json::from_str(r#"{"type":"summarize","data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_keys_payload_camel_case() {
        let payload: ValidateKeysPayload =
            serde_json::from_str(r#"{"elevenLabsKey":"xi","falAiKey":"fal"}"#).unwrap();
        assert_eq!(payload.eleven_labs_key, "xi");
        assert_eq!(payload.fal_ai_key, "fal");

        let empty: ValidateKeysPayload = serde_json::from_str("{}").unwrap();
        assert!(empty.eleven_labs_key.is_empty());
    }

    #[test]
    fn test_usage_response_limits() {
        assert_eq!(
            UsageResponse::new(2, 0),
            UsageResponse {
                used: 2,
                limit: None,
                remaining: None
            }
        );
        assert_eq!(UsageResponse::new(2, 5).remaining, Some(3));
        assert_eq!(UsageResponse::new(7, 5).remaining, Some(0));
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "Course 'x' not found".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, r#"{"message":"Course 'x' not found"}"#);
    }

    #[test]
    fn test_course_summary_hides_situations() {
        let catalog = oratoria_core::catalog::Catalog::builtin().unwrap();
        let course = catalog.course("workplace-communication").unwrap();
        let summary = CourseSummary::from(course);

        assert_eq!(summary.chapters.len(), course.chapters.len());
        assert_eq!(
            summary.chapters[0].situation_count,
            course.chapters[0].situations.len()
        );
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("aiRole"));
        assert!(json.contains("situationCount"));
    }

    #[test]
    fn test_enrollment_status_serialization() {
        let status = EnrollmentStatus {
            course_id: "workplace-communication".to_string(),
            enrolled: true,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["courseId"], "workplace-communication");
        assert_eq!(json["enrolled"], true);
    }
}
