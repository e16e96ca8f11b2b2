//! crates/askpix_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the model provider, the video search, the document store,
//! and the device camera.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::crop::{ImageSize, PixelRect};
use crate::domain::{NewSavedSolution, Question, SavedSolution, SolutionResult};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Carries the store's own message, which is shown to the user as-is.
    #[error("{0}")]
    PermissionDenied(String),
    #[error("The image is too large to save. Try cropping a smaller area.")]
    PayloadTooLarge,
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The message shown to a user when a persistence call fails.
    pub fn user_message(&self) -> String {
        match self {
            PortError::PermissionDenied(_) | PortError::PayloadTooLarge => self.to_string(),
            _ => "Failed to save the solution. Please try again.".to_string(),
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Generative Model
//=========================================================================================

/// One piece of user content sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image { mime_type: String, data: String },
}

/// The shape the model is asked to answer in.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Text,
    /// JSON matching the given schema (OpenAPI subset, as the model API expects).
    Json(serde_json::Value),
}

/// A fully built model call: instructions, content, output shape and callable tools.
#[derive(Clone)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub parts: Vec<ContentPart>,
    pub output: OutputFormat,
    pub tools: Vec<Arc<dyn Tool>>,
}

impl fmt::Debug for ModelRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRequest")
            .field("system", &self.system)
            .field("parts", &self.parts.len())
            .field("output", &self.output)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A function the model may call mid-generation.
///
/// Tools never fail: problems are reported back to the model inside the
/// returned JSON so generation can continue.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema of the arguments object.
    fn parameters(&self) -> serde_json::Value;
    async fn call(&self, args: serde_json::Value) -> serde_json::Value;
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Runs the request, executing any tool calls the model makes along the way,
    /// and returns the final text. `None` means the model produced nothing.
    async fn generate(&self, request: ModelRequest) -> PortResult<Option<String>>;
}

//=========================================================================================
// Video Search
//=========================================================================================

#[async_trait]
pub trait VideoSearchService: Send + Sync {
    /// Finds at most one video for the query. Every failure is "no video".
    async fn find_video(&self, query: &str, language: &str, region_code: &str) -> Option<String>;
}

//=========================================================================================
// Persistence
//=========================================================================================

#[async_trait]
pub trait SolutionRepository: Send + Sync {
    /// Appends a saved solution under the user; the store assigns id and timestamp.
    async fn create(&self, user_id: &str, solution: NewSavedSolution) -> PortResult<SavedSolution>;

    /// All of the user's saved solutions, newest first.
    async fn list(&self, user_id: &str) -> PortResult<Vec<SavedSolution>>;

    async fn delete(&self, user_id: &str, solution_id: Uuid) -> PortResult<()>;
}

//=========================================================================================
// Client-side Ports
//=========================================================================================

#[async_trait]
pub trait SolverClient: Send + Sync {
    /// Solves an image or text question in its language.
    async fn solve(&self, question: &Question) -> PortResult<SolutionResult>;
}

/// A still frame grabbed from the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub data_uri: String,
    /// Pixel size of the encoded image.
    pub natural: ImageSize,
    /// Size the frame is displayed at while the user selects a crop.
    pub displayed: ImageSize,
}

/// An open camera stream. Exclusively held by one scanning session.
pub trait CameraStream: Send {
    fn capture(&mut self) -> PortResult<CapturedFrame>;
    /// Stops every track. Must be idempotent.
    fn release(&mut self);
}

pub trait CameraDevice: Send + Sync {
    fn acquire(&self) -> PortResult<Box<dyn CameraStream>>;
}

pub trait ImageCropper: Send + Sync {
    /// Cuts `rect` out of the image and returns it as a new data URI.
    fn crop(&self, data_uri: &str, rect: PixelRect) -> PortResult<String>;
}
