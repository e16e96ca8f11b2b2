//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the flow endpoints and the master
//! definition for the OpenAPI specification.

use crate::config::FirebaseClientConfig;
use crate::web::error::{ErrorBody, HttpError};
use crate::web::solutions::{self, CreateSolutionRequest, SavedSolutionBody};
use crate::web::state::AppState;
use crate::web::validation::{FieldReader, Validate, Validated};
use askpix_core::domain::{ChartData, Language, QuestionContent, SolutionResult, Subject};
use askpix_core::flows::{SolveImageInput, SolveTextInput};
use axum::{
    extract::State,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        chat_handler,
        solve_handler,
        solve_text_handler,
        identify_subject_handler,
        translate_handler,
        client_config_handler,
        health_handler,
        solutions::list_solutions_handler,
        solutions::create_solution_handler,
        solutions::delete_solution_handler,
        solutions::live_solutions_handler,
    ),
    components(
        schemas(
            ChatRequest, ChatResponse, SolveRequest, SolveTextRequest, SolutionResponse,
            IdentifySubjectRequest, IdentifySubjectResponse, TranslateRequest,
            TranslateResponse, HealthResponse, ErrorBody, FirebaseClientConfig,
            CreateSolutionRequest, SavedSolutionBody,
        )
    ),
    tags(
        (name = "AskPix AI API", description = "Question solving, translation and saved solutions.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

/// A free-form message for the study assistant.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub prompt: String,
}

impl Validate for ChatRequest {
    fn validate(body: &mut FieldReader<'_>) -> Option<Self> {
        let prompt = body.string("prompt");
        Some(Self { prompt: prompt? })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub response: String,
}

/// A photographed question, already cropped.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    /// `data:<mimetype>;base64,<encoded_data>`
    pub photo_data_uri: String,
    #[schema(value_type = String, example = "en")]
    pub language: Language,
    #[schema(value_type = String, example = "Mathematics")]
    pub subject: Subject,
}

impl Validate for SolveRequest {
    fn validate(body: &mut FieldReader<'_>) -> Option<Self> {
        let photo_data_uri = body.data_uri("photoDataUri");
        let language = body.language("language");
        let subject = body.subject("subject");
        Some(Self {
            photo_data_uri: photo_data_uri?,
            language: language?,
            subject: subject?,
        })
    }
}

/// A typed question.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SolveTextRequest {
    pub question_text: String,
    #[schema(value_type = String, example = "en")]
    pub language: Language,
    #[schema(value_type = String, example = "Mathematics")]
    pub subject: Subject,
}

impl Validate for SolveTextRequest {
    fn validate(body: &mut FieldReader<'_>) -> Option<Self> {
        let question_text = body.string("questionText");
        let language = body.language("language");
        let subject = body.subject("subject");
        Some(Self {
            question_text: question_text?,
            language: language?,
            subject: subject?,
        })
    }
}

/// The structured answer to a question.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SolutionResponse {
    #[schema(value_type = String, example = "Mathematics")]
    pub identified_subject: Subject,
    pub topic: String,
    /// Markdown with LaTeX math.
    pub solution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formulas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub chart_data: Option<ChartData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_video_thumbnail: Option<String>,
}

impl From<SolutionResult> for SolutionResponse {
    fn from(result: SolutionResult) -> Self {
        Self {
            identified_subject: result.identified_subject,
            topic: result.topic,
            solution: result.solution,
            formulas: result.formulas,
            chart_data: result.chart_data,
            youtube_video_id: result.youtube_video_id,
            youtube_video_thumbnail: result.youtube_video_thumbnail,
        }
    }
}

/// A photo or typed text to classify. The photo wins when both are given.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentifySubjectRequest {
    pub photo_data_uri: Option<String>,
    pub question_text: Option<String>,
}

impl Validate for IdentifySubjectRequest {
    fn validate(body: &mut FieldReader<'_>) -> Option<Self> {
        if !body.has("photoDataUri") && !body.has("questionText") {
            body.reject("photoDataUri", "Provide either photoDataUri or questionText");
            return None;
        }
        let photo_data_uri = body.optional_data_uri("photoDataUri");
        let question_text = body.optional_string("questionText");
        if photo_data_uri.is_none() && question_text.as_deref().map_or(true, |t| t.trim().is_empty()) {
            body.reject("questionText", "Must not be empty");
            return None;
        }
        Some(Self {
            photo_data_uri,
            question_text,
        })
    }
}

impl IdentifySubjectRequest {
    fn into_content(self) -> QuestionContent {
        match (self.photo_data_uri, self.question_text) {
            (Some(data_uri), _) => QuestionContent::Image { data_uri },
            (None, text) => QuestionContent::Text {
                text: text.unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IdentifySubjectResponse {
    #[schema(value_type = String, example = "Physics")]
    pub subject: Subject,
}

/// Text to translate, markdown and math included.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: String,
    #[schema(value_type = String, example = "hi")]
    pub target_language: Language,
}

impl Validate for TranslateRequest {
    fn validate(body: &mut FieldReader<'_>) -> Option<Self> {
        let text = body.string("text");
        let target_language = body.language("targetLanguage");
        Some(Self {
            text: text?,
            target_language: target_language?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Ask the study assistant anything.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The assistant's reply", body = ChatResponse),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 500, description = "The model failed to answer", body = ErrorBody)
    )
)]
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    Validated(req): Validated<ChatRequest>,
) -> Result<Json<ChatResponse>, HttpError> {
    let response = app_state.flows.chat(&req.prompt).await?;
    Ok(Json(ChatResponse { response }))
}

/// Solve a question from a cropped photo.
///
/// The question text is read from the image first, then solved like a typed question.
#[utoipa::path(
    post,
    path = "/api/solve",
    request_body = SolveRequest,
    responses(
        (status = 200, description = "The solution", body = SolutionResponse),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 500, description = "The model failed to solve the question", body = ErrorBody)
    )
)]
pub async fn solve_handler(
    State(app_state): State<Arc<AppState>>,
    Validated(req): Validated<SolveRequest>,
) -> Result<Json<SolutionResponse>, HttpError> {
    info!(
        "Solving a photographed {} question in {}",
        req.subject, req.language
    );
    let result = app_state
        .flows
        .solve_image(&SolveImageInput {
            photo_data_uri: req.photo_data_uri,
            subject: req.subject,
            language: req.language,
        })
        .await?;
    Ok(Json(result.into()))
}

/// Solve a typed question.
#[utoipa::path(
    post,
    path = "/api/solve-text",
    request_body = SolveTextRequest,
    responses(
        (status = 200, description = "The solution", body = SolutionResponse),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 500, description = "The model failed to solve the question", body = ErrorBody)
    )
)]
pub async fn solve_text_handler(
    State(app_state): State<Arc<AppState>>,
    Validated(req): Validated<SolveTextRequest>,
) -> Result<Json<SolutionResponse>, HttpError> {
    info!("Solving a typed {} question in {}", req.subject, req.language);
    let result = app_state
        .flows
        .solve_text(&SolveTextInput {
            question_text: req.question_text,
            subject: req.subject,
            language: req.language,
        })
        .await?;
    Ok(Json(result.into()))
}

/// Classify a question into a subject.
#[utoipa::path(
    post,
    path = "/api/identify-subject",
    request_body = IdentifySubjectRequest,
    responses(
        (status = 200, description = "The identified subject", body = IdentifySubjectResponse),
        (status = 400, description = "Neither a photo nor text was given", body = ErrorBody),
        (status = 500, description = "The model failed to classify the question", body = ErrorBody)
    )
)]
pub async fn identify_subject_handler(
    State(app_state): State<Arc<AppState>>,
    Validated(req): Validated<IdentifySubjectRequest>,
) -> Result<Json<IdentifySubjectResponse>, HttpError> {
    let subject = app_state
        .flows
        .identify_subject(&req.into_content())
        .await?;
    Ok(Json(IdentifySubjectResponse { subject }))
}

/// Translate a solution into another language.
#[utoipa::path(
    post,
    path = "/api/translate",
    request_body = TranslateRequest,
    responses(
        (status = 200, description = "The translated text", body = TranslateResponse),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 500, description = "The model failed to translate", body = ErrorBody)
    )
)]
pub async fn translate_handler(
    State(app_state): State<Arc<AppState>>,
    Validated(req): Validated<TranslateRequest>,
) -> Result<Json<TranslateResponse>, HttpError> {
    let translated_text = app_state
        .flows
        .translate(&req.text, req.target_language)
        .await?;
    Ok(Json(TranslateResponse { translated_text }))
}

/// The public identity-provider settings for clients.
#[utoipa::path(
    get,
    path = "/api/client-config",
    responses((status = 200, description = "Client identity config", body = FirebaseClientConfig))
)]
pub async fn client_config_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<FirebaseClientConfig> {
    Json(app_state.config.firebase.clone())
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
