//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, the practice WebSocket, the access gate and the
//! OpenAPI documentation.

use crate::{
    gate::access_gate,
    handlers::{self, account, catalog, conversation, progress},
    models::{
        ChapterOutline, CoachResponse, ConversationAction, ConversationRequest, CourseDetail,
        CourseSummary, EnrollmentStatus, ErrorResponse, HealthResponse, LessonAccessPayload,
        ResolveTemplatePayload, SituationResponse, UsageResponse, ValidateKeysPayload,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router, middleware,
    routing::{get, post},
};
use oratoria_core::{
    catalog::{Chapter, Difficulty, Situation},
    coach::CoachRequest,
    conversation::{Message, MessageSource},
    feedback::{Feedback, FeedbackRequest},
    keys::KeyStatus,
    progress::{CourseProgress, Enrollment, LessonProgress},
    template::{SituationTemplate, TemplateVariable},
    users::UserProfile,
    voice::VoiceSessionCredentials,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        catalog::list_courses,
        catalog::get_course,
        catalog::get_chapter,
        catalog::get_situation,
        catalog::list_templates,
        catalog::resolve_template,
        progress::enroll,
        progress::unenroll,
        progress::list_enrollments,
        progress::get_course_progress,
        progress::complete_lesson,
        progress::record_lesson_access,
        progress::get_lesson_progress,
        conversation::conversation,
        conversation::feedback,
        conversation::course_coach,
        account::validate_keys,
        account::key_status,
        account::complete_onboarding,
        account::usage,
    ),
    components(
        schemas(
            ErrorResponse, HealthResponse, CourseSummary, CourseDetail, ChapterOutline,
            Chapter, Situation, Difficulty, SituationResponse, SituationTemplate, TemplateVariable,
            ResolveTemplatePayload, EnrollmentStatus, Enrollment, LessonProgress, CourseProgress,
            LessonAccessPayload, ConversationRequest, ConversationAction, FeedbackRequest,
            Feedback, Message, MessageSource, CoachRequest, CoachResponse,
            VoiceSessionCredentials, ValidateKeysPayload, KeyStatus, UserProfile, UsageResponse
        )
    ),
    tags(
        (name = "Oratoria API", description = "Conversation practice, feedback and course progress")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/courses", get(catalog::list_courses))
        .route("/api/courses/{id}", get(catalog::get_course))
        .route(
            "/api/courses/{id}/chapters/{chapter_id}",
            get(catalog::get_chapter),
        )
        .route(
            "/api/courses/{id}/chapters/{chapter_id}/situations/{situation_id}",
            get(catalog::get_situation),
        )
        .route(
            "/api/courses/{id}/enrollment",
            post(progress::enroll).delete(progress::unenroll),
        )
        .route(
            "/api/courses/{id}/progress",
            get(progress::get_course_progress),
        )
        .route("/api/enrollments", get(progress::list_enrollments))
        .route("/api/lessons/{id}/complete", post(progress::complete_lesson))
        .route(
            "/api/lessons/{id}/access",
            post(progress::record_lesson_access),
        )
        .route(
            "/api/lessons/{id}/progress",
            get(progress::get_lesson_progress),
        )
        .route("/api/templates", get(catalog::list_templates))
        .route(
            "/api/templates/{id}/resolve",
            post(catalog::resolve_template),
        )
        .route("/api/conversation", post(conversation::conversation))
        .route("/api/feedback", post(conversation::feedback))
        .route("/api/course-coach", post(conversation::course_coach))
        .route("/api/validate-keys", post(account::validate_keys))
        .route("/api/key-status", get(account::key_status))
        .route("/api/onboarding", post(account::complete_onboarding))
        .route("/api/usage", get(account::usage))
        .route("/ws/practice", get(ws_handler))
        .with_state(app_state.clone());

    // The gate wraps the fallback too, so page paths answer with redirects.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(app_state, access_gate))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::USER_ID_HEADER,
        config::Config,
        test_support::{GOOD_ELEVENLABS_KEY, TestApp},
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
        response::Response,
    };
    use oratoria_core::users::UserStore;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn request(
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn app() -> Router {
        create_router(TestApp::default().build().0)
    }

    fn feedback_body() -> Value {
        json!({
            "messages": [
                {"source": "ai", "text": "Hi, what can I get you?"},
                {"source": "user", "text": "A flat white, please."}
            ],
            "context": "Ordering coffee",
            "userGoal": "Order politely",
            "aiRole": "Barista"
        })
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = send(&app(), request(Method::GET, "/health", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_feedback_requires_a_user() {
        let response = send(
            &app(),
            request(Method::POST, "/api/feedback", None, Some(feedback_body())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_feedback_has_exactly_three_fields() {
        let response = send(
            &app(),
            request(Method::POST, "/api/feedback", Some("u1"), Some(feedback_body())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(body["perception"], "Confident");
        assert_eq!(body["strongPoints"], json!(["Clear"]));
        assert_eq!(body["improvementAreas"], json!(["Pace"]));
    }

    #[tokio::test]
    async fn test_malformed_llm_answer_is_a_server_error() {
        let (state, _) = TestApp {
            llm_response: "Sure! Here is some feedback: you did great.".to_string(),
            ..TestApp::default()
        }
        .build();
        let response = send(
            &create_router(state),
            request(Method::POST, "/api/feedback", Some("u1"), Some(feedback_body())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["message"],
            "Failed to generate feedback"
        );
    }

    #[tokio::test]
    async fn test_feedback_rejects_empty_messages() {
        let mut body = feedback_body();
        body["messages"] = json!([]);
        let response = send(
            &app(),
            request(Method::POST, "/api/feedback", Some("u1"), Some(body)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_bad_requests() {
        let app = app();
        let mut no_messages = feedback_body();
        no_messages.as_object_mut().unwrap().remove("messages");
        let cases = [
            ("/api/feedback", no_messages.clone()),
            (
                "/api/course-coach",
                json!({"promptTemplate": "Review: {userResponse}", "userResponse": "Hi"}),
            ),
            ("/api/conversation", json!({"type": "feedback", "data": no_messages})),
            ("/api/conversation", json!({"type": "shout"})),
        ];
        for (uri, body) in cases {
            let response = send(&app, request(Method::POST, uri, Some("u1"), Some(body))).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                "application/json",
                "{uri}"
            );
            let message = json_body(response).await["message"].clone();
            assert!(message.as_str().is_some_and(|m| !m.is_empty()), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_body_without_json_content_type_is_a_bad_request() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/validate-keys")
            .body(Body::from(r#"{"elevenLabsKey":"k"}"#))
            .unwrap();
        let response = send(&app(), req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["message"].is_string());
    }

    #[tokio::test]
    async fn test_lesson_access_without_body() {
        let response = send(
            &app(),
            request(Method::POST, "/api/lessons/small-talk/access", Some("u1"), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["lesson_id"], "small-talk");
        assert!(body["current_stage"].is_null());
    }

    #[tokio::test]
    async fn test_conversation_start_returns_credentials() {
        let (state, store) = TestApp::default().build();
        let response = send(
            &create_router(state),
            request(
                Method::POST,
                "/api/conversation",
                Some("u1"),
                Some(json!({"type": "start"})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"url": "wss://vendor.test/convai", "agentId": "agent-test"})
        );
        let profile = store.profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.free_conversations_used, 1);
    }

    #[tokio::test]
    async fn test_conversation_start_vendor_failure() {
        let (state, _) = TestApp {
            voice_fails: true,
            ..TestApp::default()
        }
        .build();
        let response = send(
            &create_router(state),
            request(
                Method::POST,
                "/api/conversation",
                None,
                Some(json!({"type": "start"})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["message"],
            "Failed to start conversation"
        );
    }

    #[tokio::test]
    async fn test_conversation_limit_is_enforced() {
        let (state, store) = TestApp {
            config: Config {
                free_conversation_limit: 1,
                ..Config::default()
            },
            ..TestApp::default()
        }
        .build();
        store.record_conversation("u1", 0).await.unwrap();
        let response = send(
            &create_router(state),
            request(
                Method::POST,
                "/api/conversation",
                Some("u1"),
                Some(json!({"type": "start"})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_validate_keys_reports_each_vendor() {
        let response = send(
            &app(),
            request(
                Method::POST,
                "/api/validate-keys",
                None,
                Some(json!({"elevenLabsKey": GOOD_ELEVENLABS_KEY, "falAiKey": "bad"})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"elevenlabs": true, "falai": false})
        );
    }

    #[tokio::test]
    async fn test_enrollment_is_idempotent() {
        let app = app();
        for _ in 0..2 {
            let response = send(
                &app,
                request(
                    Method::POST,
                    "/api/courses/workplace-communication/enrollment",
                    Some("u1"),
                    None,
                ),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["enrolled"], true);
        }

        let response = send(
            &app,
            request(Method::GET, "/api/enrollments", Some("u1"), None),
        )
        .await;
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unenroll_without_enrollment_succeeds() {
        let response = send(
            &app(),
            request(
                Method::DELETE,
                "/api/courses/workplace-communication/enrollment",
                Some("u1"),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["enrolled"], false);
    }

    #[tokio::test]
    async fn test_unknown_course_is_not_found() {
        let response = send(
            &app(),
            request(Method::GET, "/api/courses/underwater-basket-weaving", Some("u1"), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chapter_of_enrollable_course_needs_enrollment() {
        let app = app();
        let uri = "/api/courses/workplace-communication/chapters/negotiation";
        let response = send(&app, request(Method::GET, uri, Some("u1"), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        send(
            &app,
            request(
                Method::POST,
                "/api/courses/workplace-communication/enrollment",
                Some("u1"),
                None,
            ),
        )
        .await;
        let response = send(&app, request(Method::GET, uri, Some("u1"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], "negotiation");
    }

    #[tokio::test]
    async fn test_open_course_chapter_is_readable() {
        let response = send(
            &app(),
            request(
                Method::GET,
                "/api/courses/everyday-confidence/chapters/small-talk",
                Some("u1"),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_resolve_template() {
        let response = send(
            &app(),
            request(
                Method::POST,
                "/api/templates/reject-call-center/resolve",
                Some("u1"),
                Some(json!({"variables": {"product": "solar panels"}})),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["context"], "You keep getting calls about solar panels");
        assert_eq!(body["difficulty"], "easy");
    }

    #[tokio::test]
    async fn test_course_coach_rejects_blank_answers() {
        let response = send(
            &app(),
            request(
                Method::POST,
                "/api/course-coach",
                Some("u1"),
                Some(json!({
                    "promptTemplate": "Review: {userResponse}",
                    "userResponse": "   ",
                    "lessonId": "small-talk"
                })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_anonymous_pages_redirect_to_sign_in() {
        let response = send(&app(), request(Method::GET, "/dashboard", None, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/sign-in");
    }

    #[tokio::test]
    async fn test_onboarding_redirects_follow_profile() {
        let (state, store) = TestApp::default().build();
        let app = create_router(state);

        let response = send(&app, request(Method::GET, "/dashboard", Some("u1"), None)).await;
        assert_eq!(response.headers()[header::LOCATION], "/onboarding");

        store.complete_onboarding("u1").await.unwrap();
        let response = send(&app, request(Method::GET, "/onboarding", Some("u1"), None)).await;
        assert_eq!(response.headers()[header::LOCATION], "/dashboard");
    }

    #[tokio::test]
    async fn test_usage_reports_remaining_conversations() {
        let (state, store) = TestApp {
            config: Config {
                free_conversation_limit: 3,
                ..Config::default()
            },
            ..TestApp::default()
        }
        .build();
        store.record_conversation("u1", 0).await.unwrap();
        let response = send(
            &create_router(state),
            request(Method::GET, "/api/usage", Some("u1"), None),
        )
        .await;
        assert_eq!(
            json_body(response).await,
            json!({"used": 1, "limit": 3, "remaining": 2})
        );
    }
}
