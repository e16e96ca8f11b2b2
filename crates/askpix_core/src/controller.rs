//! crates/askpix_core/src/controller.rs
//!
//! Drives the scan state machine against the client-side ports. The controller
//! is the single owner of the camera stream: it opens the stream when the state
//! enters camera scanning and closes it on every way out, including drop.

use std::sync::Arc;
use tracing::{info, warn};

use crate::crop::CropRect;
use crate::domain::{Language, NewSavedSolution, Question, QuestionContent, SavedSolution, Subject};
use crate::ports::{
    CameraDevice, CameraStream, ImageCropper, PortError, PortResult, SolutionRepository,
    SolverClient,
};
use crate::scanner::{transition, ScanEvent, ScanMode, ScanState, TransitionError};

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Port(#[from] PortError),
}

/// The subject hint and language the user has picked for the next question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub subject: Subject,
    pub language: Language,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            subject: Subject::Mathematics,
            language: Language::En,
        }
    }
}

pub struct ScanController {
    state: ScanState,
    selection: Selection,
    camera: Arc<dyn CameraDevice>,
    stream: Option<Box<dyn CameraStream>>,
    camera_error: Option<String>,
    solver: Arc<dyn SolverClient>,
    cropper: Arc<dyn ImageCropper>,
}

impl ScanController {
    pub fn new(
        camera: Arc<dyn CameraDevice>,
        solver: Arc<dyn SolverClient>,
        cropper: Arc<dyn ImageCropper>,
    ) -> Self {
        Self {
            state: ScanState::Welcome,
            selection: Selection::default(),
            camera,
            stream: None,
            camera_error: None,
            solver,
            cropper,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn select_subject(&mut self, subject: Subject) {
        self.selection.subject = subject;
    }

    /// Picks the language for the next question. Use `change_language` to
    /// re-solve the question on screen.
    pub fn select_language(&mut self, language: Language) {
        self.selection.language = language;
    }

    pub fn is_camera_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Why the camera could not be opened, for the inline alert.
    pub fn camera_error(&self) -> Option<&str> {
        self.camera_error.as_deref()
    }

    //=====================================================================================
    // User Actions
    //=====================================================================================

    pub fn start_scan(&mut self) -> Result<(), ControllerError> {
        self.apply(ScanEvent::StartScan)
    }

    pub fn use_text_input(&mut self) -> Result<(), ControllerError> {
        self.apply(ScanEvent::SwitchMode(ScanMode::Text))
    }

    pub fn use_camera(&mut self) -> Result<(), ControllerError> {
        self.apply(ScanEvent::SwitchMode(ScanMode::Camera))
    }

    pub fn capture(&mut self) -> Result<(), ControllerError> {
        if !self.state.uses_camera() {
            return Err(TransitionError::NotAllowed {
                state: self.state.name(),
                event: "capture",
            }
            .into());
        }
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| PortError::Unexpected("The camera is not available.".to_string()))?;
        let frame = stream.capture()?;
        self.apply(ScanEvent::Capture(frame))
    }

    pub fn adjust_crop(&mut self, rect: CropRect) -> Result<(), ControllerError> {
        self.apply(ScanEvent::AdjustCrop(rect))
    }

    pub fn retake(&mut self) -> Result<(), ControllerError> {
        self.apply(ScanEvent::Retake)
    }

    /// Cuts the selection out of the captured frame and solves it.
    pub async fn submit_crop(&mut self) -> Result<(), ControllerError> {
        let (frame, rect) = match &self.state {
            ScanState::Cropping { frame, rect } => (frame.clone(), *rect),
            other => {
                return Err(TransitionError::NotAllowed {
                    state: other.name(),
                    event: "submit crop",
                }
                .into())
            }
        };
        let pixels = rect
            .to_pixels(frame.natural, frame.displayed)
            .ok_or(TransitionError::EmptyCrop)?;
        let cropped = self.cropper.crop(&frame.data_uri, pixels)?;

        let question = Question {
            content: QuestionContent::Image { data_uri: cropped },
            subject: self.selection.subject,
            language: self.selection.language,
        };
        self.apply(ScanEvent::SubmitCrop(question))?;
        self.solve_current().await;
        Ok(())
    }

    pub async fn submit_text(&mut self, text: &str) -> Result<(), ControllerError> {
        let question = Question {
            content: QuestionContent::Text {
                text: text.trim().to_string(),
            },
            subject: self.selection.subject,
            language: self.selection.language,
        };
        self.apply(ScanEvent::SubmitText(question))?;
        self.solve_current().await;
        Ok(())
    }

    /// Re-solves the question on screen in another language. The old solution
    /// stays visible meanwhile and comes back if the request fails; the selected
    /// language only moves once the new solution arrives.
    pub async fn change_language(&mut self, language: Language) -> Result<(), ControllerError> {
        self.apply(ScanEvent::ChangeLanguage(language))?;
        if self.solve_current().await {
            self.selection.language = language;
        }
        Ok(())
    }

    pub fn scan_another(&mut self) -> Result<(), ControllerError> {
        self.apply(ScanEvent::ScanAnother)
    }

    /// Hard reset to the welcome screen. Always allowed.
    pub fn reset(&mut self) {
        if let Err(e) = self.apply(ScanEvent::Reset) {
            warn!("Reset was rejected: {}", e);
        }
    }

    /// Saves the solution on screen, stamped with the subject pair and language
    /// it was produced under.
    pub async fn save(
        &self,
        store: &dyn SolutionRepository,
        user_id: &str,
    ) -> PortResult<SavedSolution> {
        match &self.state {
            ScanState::Result {
                question,
                solution: Some(solution),
                ..
            } => {
                store
                    .create(user_id, NewSavedSolution::from_result(question, solution))
                    .await
            }
            _ => Err(PortError::NotFound("There is no solution to save.".to_string())),
        }
    }

    //=====================================================================================
    // Internals
    //=====================================================================================

    fn apply(&mut self, event: ScanEvent) -> Result<(), ControllerError> {
        let from = self.state.name();
        let event_name = event.name();
        self.state = transition(&self.state, event)?;
        info!("Scan state {} --{}--> {}", from, event_name, self.state.name());
        self.sync_camera();
        Ok(())
    }

    /// Opens the stream on entering camera scanning, closes it on leaving.
    fn sync_camera(&mut self) {
        if self.state.uses_camera() {
            if self.stream.is_none() {
                match self.camera.acquire() {
                    Ok(stream) => {
                        self.stream = Some(stream);
                        self.camera_error = None;
                    }
                    Err(e) => {
                        warn!("Could not open the camera: {}", e);
                        self.camera_error = Some(e.to_string());
                    }
                }
            }
        } else {
            self.release_camera();
        }
    }

    fn release_camera(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
        }
    }

    /// Awaits the solver for the question in `Solving` and always completes,
    /// whatever the outcome.
    /// Returns whether the solver answered.
    async fn solve_current(&mut self) -> bool {
        let question = match &self.state {
            ScanState::Solving { question, .. } => question.clone(),
            _ => return false,
        };

        let outcome = self
            .solver
            .solve(&question)
            .await
            .map_err(|e| e.to_string());
        if let Err(e) = &outcome {
            warn!("Solving failed: {}", e);
        }

        let solved = outcome.is_ok();
        if let Err(e) = self.apply(ScanEvent::Completed(outcome)) {
            warn!("Dropped a solve completion: {}", e);
            return false;
        }
        solved
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        self.release_camera();
    }
}
