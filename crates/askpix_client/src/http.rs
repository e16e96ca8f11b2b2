//! crates/askpix_client/src/http.rs
//!
//! An HTTP client for the AskPix API. It serves the scan controller as its
//! `SolverClient` and as the `SolutionRepository` for saved solutions, and
//! follows the live saved-solution list over a WebSocket.

use askpix_core::domain::{
    Language, NewSavedSolution, Question, QuestionContent, SavedSolution, SolutionResult, Subject,
};
use askpix_core::ports::{PortResult, SolutionRepository, SolverClient};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::pin::Pin;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

const USER_ID_HEADER: &str = "x-user-id";

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct SubjectResponse {
    subject: Subject,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

/// Newest-first snapshots of a user's saved solutions. Dropping it closes the socket.
pub type SolutionUpdates = Pin<Box<dyn Stream<Item = ClientResult<Vec<SavedSolution>>> + Send>>;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(180))
            .build()?;
        Ok(Self { http, config })
    }

    /// Builds a client from the environment (`ASKPIX_API_BASE_URL`).
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.config.url(path))
    }

    async fn send(&self, builder: RequestBuilder) -> ClientResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| format!("Request failed with status {}", status));
        warn!("API call failed ({}): {}", status, message);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = self.send(builder).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> ClientResult<T> {
        self.json(self.request(Method::POST, path).json(&body)).await
    }

    //=====================================================================================
    // Flow Endpoints
    //=====================================================================================

    pub async fn chat(&self, prompt: &str) -> ClientResult<String> {
        let reply: ChatResponse = self.post_json("/api/chat", json!({ "prompt": prompt })).await?;
        Ok(reply.response)
    }

    pub async fn identify_subject(&self, question: &QuestionContent) -> ClientResult<Subject> {
        let body = match question {
            QuestionContent::Image { data_uri } => json!({ "photoDataUri": data_uri }),
            QuestionContent::Text { text } => json!({ "questionText": text }),
        };
        let reply: SubjectResponse = self.post_json("/api/identify-subject", body).await?;
        Ok(reply.subject)
    }

    pub async fn translate(&self, text: &str, language: Language) -> ClientResult<String> {
        let reply: TranslateResponse = self
            .post_json(
                "/api/translate",
                json!({ "text": text, "targetLanguage": language }),
            )
            .await?;
        Ok(reply.translated_text)
    }

    pub async fn solve_question(&self, question: &Question) -> ClientResult<SolutionResult> {
        let (path, body) = match &question.content {
            QuestionContent::Image { data_uri } => (
                "/api/solve",
                json!({
                    "photoDataUri": data_uri,
                    "language": question.language,
                    "subject": question.subject,
                }),
            ),
            QuestionContent::Text { text } => (
                "/api/solve-text",
                json!({
                    "questionText": text,
                    "language": question.language,
                    "subject": question.subject,
                }),
            ),
        };
        info!("Requesting a solution from {}", path);
        self.post_json(path, body).await
    }
}

#[async_trait]
impl SolverClient for ApiClient {
    async fn solve(&self, question: &Question) -> PortResult<SolutionResult> {
        Ok(self.solve_question(question).await?)
    }
}

//=========================================================================================
// Saved Solutions
//=========================================================================================

impl ApiClient {
    /// Follows the user's saved solutions. The first item is the current list,
    /// then one arrives after every create or delete.
    pub async fn subscribe(&self, user_id: &str) -> ClientResult<SolutionUpdates> {
        let mut request = self
            .config
            .ws_url("/api/solutions/live")
            .as_str()
            .into_client_request()?;
        let user = HeaderValue::from_str(user_id)
            .map_err(|e| tungstenite::Error::HttpFormat(e.into()))?;
        request.headers_mut().insert(USER_ID_HEADER, user);

        let (socket, _) = connect_async(request).await?;
        info!("Following live solutions for user {}", user_id);

        Ok(Box::pin(async_stream::stream! {
            let mut socket = socket;
            while let Some(message) = socket.next().await {
                match message {
                    Ok(Message::Text(text)) => yield parse_live_update(&text),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(ClientError::from(e));
                        break;
                    }
                }
            }
            debug!("Live solutions socket ended");
        }))
    }
}

fn parse_live_update(text: &str) -> ClientResult<Vec<SavedSolution>> {
    if let Ok(list) = serde_json::from_str::<Vec<SavedSolution>>(text) {
        return Ok(list);
    }
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(ErrorBody {
            error: Some(message),
        }) => Err(ClientError::Live(message)),
        _ => Err(ClientError::InvalidResponse(format!(
            "unrecognised live update: {}",
            text
        ))),
    }
}

#[async_trait]
impl SolutionRepository for ApiClient {
    async fn create(&self, user_id: &str, solution: NewSavedSolution) -> PortResult<SavedSolution> {
        let builder = self
            .request(Method::POST, "/api/solutions")
            .header(USER_ID_HEADER, user_id)
            .json(&solution);
        Ok(self.json(builder).await?)
    }

    async fn list(&self, user_id: &str) -> PortResult<Vec<SavedSolution>> {
        let builder = self
            .request(Method::GET, "/api/solutions")
            .header(USER_ID_HEADER, user_id);
        Ok(self.json(builder).await?)
    }

    async fn delete(&self, user_id: &str, solution_id: Uuid) -> PortResult<()> {
        let builder = self
            .request(Method::DELETE, &format!("/api/solutions/{}", solution_id))
            .header(USER_ID_HEADER, user_id);
        self.send(builder).await?;
        Ok(())
    }
}
