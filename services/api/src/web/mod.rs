pub mod error;
pub mod middleware;
pub mod rest;
pub mod solutions;
pub mod state;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::middleware::{preflight_no_content, require_user};
use crate::web::rest::ApiDoc;
use crate::web::state::AppState;

/// Photos arrive as base64 data URIs inside JSON bodies.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Creates the HTTP router with all API endpoints.
///
/// - Flow endpoints under `/api`
/// - Saved-solution endpoints under `/api/solutions`, requiring `x-user-id`
/// - Swagger UI at `/swagger-ui`, the OpenAPI document at `/api-docs/openapi.json`
/// - CORS for any origin; preflights answer 204
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let flow_routes = Router::new()
        .route("/chat", post(rest::chat_handler))
        .route("/solve", post(rest::solve_handler))
        .route("/solve-text", post(rest::solve_text_handler))
        .route("/identify-subject", post(rest::identify_subject_handler))
        .route("/translate", post(rest::translate_handler))
        .route("/client-config", get(rest::client_config_handler));

    let solution_routes = Router::new()
        .route(
            "/solutions",
            get(solutions::list_solutions_handler).post(solutions::create_solution_handler),
        )
        .route("/solutions/live", get(solutions::live_solutions_handler))
        .route("/solutions/{id}", delete(solutions::delete_solution_handler))
        .route_layer(axum_middleware::from_fn(require_user));

    let api_router = Router::new()
        .route("/health", get(rest::health_handler))
        .nest("/api", flow_routes.merge(solution_routes))
        .with_state(Arc::new(state));

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(preflight_no_content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::feed::SolutionFeed;
    use crate::config::Config;
    use askpix_core::flows::Flows;
    use askpix_core::ports::{GenerativeModel, ModelRequest, PortResult, VideoSearchService};
    use askpix_core::{MemorySolutionRepository, PromptTemplates};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Answers every model call with the same text.
    struct CannedModel(Option<String>);

    #[async_trait]
    impl GenerativeModel for CannedModel {
        async fn generate(&self, _request: ModelRequest) -> PortResult<Option<String>> {
            Ok(self.0.clone())
        }
    }

    struct NoVideos;

    #[async_trait]
    impl VideoSearchService for NoVideos {
        async fn find_video(&self, _query: &str, _language: &str, _region: &str) -> Option<String> {
            None
        }
    }

    const INTEGRAL_SOLUTION: &str = r#"{
        "identifiedSubject": "Mathematics",
        "topic": "Integration",
        "solution": "Using the power rule, $\\int 2x\\,dx = x^2 + C$."
    }"#;

    fn test_router(reply: Option<&str>, max_image_bytes: usize) -> Router {
        let flows = Flows::new(
            Arc::new(CannedModel(reply.map(str::to_string))),
            Arc::new(NoVideos),
            Arc::new(PromptTemplates::default()),
        );
        let store = Arc::new(MemorySolutionRepository::new(max_image_bytes));
        create_router(AppState {
            config: Arc::new(Config::default()),
            flows: Arc::new(flows),
            solutions: Arc::new(SolutionFeed::new(store)),
        })
    }

    fn json_request(method: Method, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn empty_request(method: Method, uri: &str, user: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn saved_solution_body(image: Option<&str>) -> Value {
        json!({
            "croppedImage": image,
            "topic": "Integration",
            "solution": "x^2 + C",
            "subject": "Mathematics",
            "identifiedSubject": "Mathematics",
            "language": "en"
        })
    }

    // ------------------------------------------------------------------------
    // Flow endpoint tests
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn solve_text_answers_the_integral_question() {
        let router = test_router(Some(INTEGRAL_SOLUTION), 1024);

        let response = router
            .oneshot(json_request(
                Method::POST,
                "/api/solve-text",
                None,
                json!({
                    "questionText": "What is the integral of 2x dx?",
                    "language": "en",
                    "subject": "Mathematics"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["identifiedSubject"], "Mathematics");
        assert!(body["solution"].as_str().unwrap().contains("x^2"));
        assert!(body.get("youtubeVideoId").is_none());
    }

    #[tokio::test]
    async fn empty_solve_body_is_rejected_per_field() {
        let router = test_router(Some(INTEGRAL_SOLUTION), 1024);

        let response = router
            .oneshot(json_request(Method::POST, "/api/solve", None, json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert!(body["error"].is_string());
        for field in ["photoDataUri", "language", "subject"] {
            assert!(body["details"][field].is_array(), "missing detail for {}", field);
        }
    }

    #[tokio::test]
    async fn unknown_subjects_are_rejected() {
        let router = test_router(Some(INTEGRAL_SOLUTION), 1024);

        let response = router
            .oneshot(json_request(
                Method::POST,
                "/api/solve-text",
                None,
                json!({ "questionText": "2+2?", "language": "fr", "subject": "Art" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert!(body["details"]["subject"][0].as_str().unwrap().contains("received 'Art'"));
        assert!(body["details"]["language"][0].as_str().unwrap().contains("'hi'"));
    }

    #[tokio::test]
    async fn empty_model_output_is_a_500_with_an_error() {
        let router = test_router(None, 1024);

        let response = router
            .oneshot(json_request(
                Method::POST,
                "/api/solve",
                None,
                json!({
                    "photoDataUri": "data:image/png;base64,iVBORw0KGgo=",
                    "language": "hi",
                    "subject": "Physics"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["error"], "Model produced no output.");
    }

    #[tokio::test]
    async fn chat_returns_the_reply() {
        let router = test_router(Some("Photosynthesis turns light into sugar."), 1024);

        let response = router
            .oneshot(json_request(
                Method::POST,
                "/api/chat",
                None,
                json!({ "prompt": "What is photosynthesis?" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["response"], "Photosynthesis turns light into sugar.");
    }

    #[tokio::test]
    async fn identify_subject_needs_a_photo_or_text() {
        let router = test_router(Some(r#"{"subject":"Biology"}"#), 1024);

        let response = router
            .clone()
            .oneshot(json_request(Method::POST, "/api/identify-subject", None, json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(json_request(
                Method::POST,
                "/api/identify-subject",
                None,
                json!({ "questionText": "What do mitochondria do?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["subject"], "Biology");
    }

    #[tokio::test]
    async fn translate_returns_the_translated_text() {
        let router = test_router(Some(r#"{"translatedText":"नमस्ते"}"#), 1024);

        let response = router
            .oneshot(json_request(
                Method::POST,
                "/api/translate",
                None,
                json!({ "text": "Hello", "targetLanguage": "hi" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["translatedText"], "नमस्ते");
    }

    // ------------------------------------------------------------------------
    // Saved solution tests
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn solutions_require_a_user() {
        let router = test_router(None, 1024);

        let response = router
            .oneshot(empty_request(Method::GET, "/api/solutions", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(read_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn saved_solutions_can_be_created_listed_and_deleted() {
        let router = test_router(None, 1024);

        let response = router
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/solutions",
                Some("alice"),
                saved_solution_body(None),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = read_json(response).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert!(created["createdAt"].is_string());

        let response = router
            .clone()
            .oneshot(empty_request(Method::GET, "/api/solutions", Some("alice")))
            .await
            .unwrap();
        let list = read_json(response).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["id"], id.as_str());

        let uri = format!("/api/solutions/{}", id);
        let response = router
            .clone()
            .oneshot(empty_request(Method::DELETE, &uri, Some("mallory")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            read_json(response).await["error"],
            "You don't have permission to delete this solution."
        );

        let response = router
            .clone()
            .oneshot(empty_request(Method::DELETE, &uri, Some("alice")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = router
            .clone()
            .oneshot(empty_request(Method::GET, "/api/solutions", Some("alice")))
            .await
            .unwrap();
        assert!(read_json(response).await.as_array().unwrap().is_empty());

        let response = router
            .oneshot(empty_request(Method::DELETE, &uri, Some("alice")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_images_are_413() {
        let router = test_router(None, 16);

        let response = router
            .oneshot(json_request(
                Method::POST,
                "/api/solutions",
                Some("alice"),
                saved_solution_body(Some("data:image/jpeg;base64,AAAAAAAAAAAAAAAAAAAAAAAA")),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            read_json(response).await["error"],
            "The image is too large to save. Try cropping a smaller area."
        );
    }

    // ------------------------------------------------------------------------
    // Router configuration tests
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn preflight_is_204_for_any_origin() {
        let router = test_router(None, 1024);

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/solve")
                    .header("origin", "http://localhost:9002")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }

    #[tokio::test]
    async fn health_and_client_config_are_public() {
        let router = test_router(None, 1024);

        let response = router
            .clone()
            .oneshot(empty_request(Method::GET, "/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "ok");

        let response = router
            .oneshot(empty_request(Method::GET, "/api/client-config", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(read_json(response).await.is_object());
    }
}
