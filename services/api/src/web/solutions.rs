//! services/api/src/web/solutions.rs
//!
//! Handlers for the caller's saved solutions, including the live list socket.

use crate::adapters::feed::snapshots;
use crate::web::error::{ErrorBody, HttpError};
use crate::web::middleware::UserId;
use crate::web::state::AppState;
use crate::web::validation::{FieldReader, Validate, Validated};
use askpix_core::domain::{Language, NewSavedSolution, SavedSolution, Subject};
use askpix_core::ports::SolutionRepository;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Payload Structs
//=========================================================================================

/// A solution to keep, as shown to the user when they saved it.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSolutionRequest {
    /// The cropped photo as a data URI; absent for typed questions.
    pub cropped_image: Option<String>,
    pub topic: String,
    pub solution: String,
    pub formulas: Option<String>,
    #[schema(value_type = String, example = "Physics")]
    pub subject: Subject,
    #[schema(value_type = String, example = "Physics")]
    pub identified_subject: Subject,
    #[schema(value_type = String, example = "en")]
    pub language: Language,
    pub youtube_video_id: Option<String>,
    pub youtube_video_thumbnail: Option<String>,
}

impl Validate for CreateSolutionRequest {
    fn validate(body: &mut FieldReader<'_>) -> Option<Self> {
        let cropped_image = body.optional_data_uri("croppedImage");
        let image_ok = !body.has("croppedImage") || cropped_image.is_some();
        let topic = body.string("topic");
        let solution = body.string("solution");
        let formulas = body.optional_string("formulas");
        let subject = body.subject("subject");
        let identified_subject = body.subject("identifiedSubject");
        let language = body.language("language");
        let youtube_video_id = body.optional_string("youtubeVideoId");
        let youtube_video_thumbnail = body.optional_string("youtubeVideoThumbnail");
        if !image_ok {
            return None;
        }
        Some(Self {
            cropped_image,
            topic: topic?,
            solution: solution?,
            formulas,
            subject: subject?,
            identified_subject: identified_subject?,
            language: language?,
            youtube_video_id,
            youtube_video_thumbnail,
        })
    }
}

impl From<CreateSolutionRequest> for NewSavedSolution {
    fn from(req: CreateSolutionRequest) -> Self {
        Self {
            cropped_image: req.cropped_image,
            topic: req.topic,
            solution: req.solution,
            formulas: req.formulas,
            subject: req.subject,
            identified_subject: req.identified_subject,
            language: req.language,
            youtube_video_id: req.youtube_video_id,
            youtube_video_thumbnail: req.youtube_video_thumbnail,
        }
    }
}

/// A stored solution. `id` and `createdAt` are assigned by the server.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavedSolutionBody {
    pub id: Uuid,
    pub cropped_image: Option<String>,
    pub topic: String,
    pub solution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formulas: Option<String>,
    #[schema(value_type = String)]
    pub subject: Subject,
    #[schema(value_type = String)]
    pub identified_subject: Subject,
    #[schema(value_type = String)]
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_video_thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<SavedSolution> for SavedSolutionBody {
    fn from(saved: SavedSolution) -> Self {
        Self {
            id: saved.id,
            cropped_image: saved.cropped_image,
            topic: saved.topic,
            solution: saved.solution,
            formulas: saved.formulas,
            subject: saved.subject,
            identified_subject: saved.identified_subject,
            language: saved.language,
            youtube_video_id: saved.youtube_video_id,
            youtube_video_thumbnail: saved.youtube_video_thumbnail,
            created_at: saved.created_at,
        }
    }
}

fn to_bodies(list: Vec<SavedSolution>) -> Vec<SavedSolutionBody> {
    list.into_iter().map(SavedSolutionBody::from).collect()
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the caller's saved solutions, newest first.
#[utoipa::path(
    get,
    path = "/api/solutions",
    responses(
        (status = 200, description = "Saved solutions, newest first", body = [SavedSolutionBody]),
        (status = 401, description = "Missing x-user-id header", body = ErrorBody)
    ),
    params(("x-user-id" = String, Header, description = "The caller's user id."))
)]
pub async fn list_solutions_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<Json<Vec<SavedSolutionBody>>, HttpError> {
    let list = app_state.solutions.list(&user_id).await?;
    Ok(Json(to_bodies(list)))
}

/// Save a solution under the caller.
#[utoipa::path(
    post,
    path = "/api/solutions",
    request_body = CreateSolutionRequest,
    responses(
        (status = 201, description = "The stored solution", body = SavedSolutionBody),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 401, description = "Missing x-user-id header", body = ErrorBody),
        (status = 413, description = "The cropped image is too large to store", body = ErrorBody)
    ),
    params(("x-user-id" = String, Header, description = "The caller's user id."))
)]
pub async fn create_solution_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Validated(req): Validated<CreateSolutionRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let saved = app_state.solutions.create(&user_id, req.into()).await?;
    info!("Saved solution {} for user {}", saved.id, user_id);
    Ok((StatusCode::CREATED, Json(SavedSolutionBody::from(saved))))
}

/// Delete one of the caller's saved solutions.
#[utoipa::path(
    delete,
    path = "/api/solutions/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Missing x-user-id header", body = ErrorBody),
        (status = 403, description = "The solution belongs to another user", body = ErrorBody),
        (status = 404, description = "No such solution", body = ErrorBody)
    ),
    params(
        ("id" = Uuid, Path, description = "The saved solution's id."),
        ("x-user-id" = String, Header, description = "The caller's user id.")
    )
)]
pub async fn delete_solution_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    app_state.solutions.delete(&user_id, id).await?;
    info!("Deleted solution {} for user {}", id, user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Live list of the caller's saved solutions.
///
/// Upgrades to a WebSocket that sends the full list as a JSON array on connect
/// and again after every change.
#[utoipa::path(
    get,
    path = "/api/solutions/live",
    responses(
        (status = 101, description = "Switching to the live list socket"),
        (status = 401, description = "Missing x-user-id header", body = ErrorBody)
    ),
    params(("x-user-id" = String, Header, description = "The caller's user id."))
)]
pub async fn live_solutions_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: String) {
    info!("Live solutions socket opened for user {}", user_id);
    let (mut sender, mut receiver) = socket.split();

    let mut updates = match app_state.solutions.subscribe(&user_id).await {
        Ok(rx) => Box::pin(snapshots(rx)),
        Err(e) => {
            error!("Failed to subscribe user {} to live solutions: {}", user_id, e);
            let body = serde_json::json!({ "error": e.to_string() }).to_string();
            let _ = sender.send(Message::Text(body.into())).await;
            return;
        }
    };

    loop {
        tokio::select! {
            update = updates.next() => {
                let Some(list) = update else { break };
                let json = match serde_json::to_string(&to_bodies(list)) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize live solutions: {}", e);
                        break;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    warn!("Live solutions socket for user {} went away", user_id);
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    }
    drop(updates);
    app_state.solutions.release_idle();
    info!("Live solutions socket closed for user {}", user_id);
}
