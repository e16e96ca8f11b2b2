//! crates/askpix_core/src/scanner.rs
//!
//! The client's screen flow as a tagged union and a pure transition function:
//!
//! ```text
//! welcome -> scanning -> cropping -> solving -> result
//!               |  ^________|           ^         |
//!               |   retake              |         |
//!               +--- text submit -------+         |
//!               ^_________ scan another __________|
//! ```
//!
//! `Reset` returns to `Welcome` from anywhere. The function owns no resources;
//! the controller acquires and releases the camera around it.

use crate::crop::CropRect;
use crate::domain::{Language, Question, QuestionContent, SolutionResult};
use crate::ports::CapturedFrame;

/// How the scanning screen takes its question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Camera,
    Text,
}

/// A question together with the solution currently shown for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Answered {
    pub question: Question,
    pub solution: SolutionResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    Welcome,
    Scanning {
        mode: ScanMode,
    },
    Cropping {
        frame: CapturedFrame,
        rect: CropRect,
    },
    /// Waiting on the solver. `previous` stays on screen during a language change.
    Solving {
        question: Question,
        previous: Option<Answered>,
    },
    /// Terminal screen for one question. At least one of `solution` and `error`
    /// is present; both are present when a language change failed.
    Result {
        question: Question,
        solution: Option<SolutionResult>,
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    StartScan,
    SwitchMode(ScanMode),
    Capture(CapturedFrame),
    AdjustCrop(CropRect),
    Retake,
    /// The cropped photo, already cut from the frame.
    SubmitCrop(Question),
    SubmitText(Question),
    ChangeLanguage(Language),
    Completed(Result<SolutionResult, String>),
    ScanAnother,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("'{event}' is not allowed while {state}")]
    NotAllowed {
        state: &'static str,
        event: &'static str,
    },
    #[error("Select an area of the photo first")]
    EmptyCrop,
    #[error("Type a question first")]
    EmptyQuestion,
    #[error("There is no solution to translate")]
    NothingToTranslate,
}

impl ScanState {
    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Welcome => "welcome",
            ScanState::Scanning { .. } => "scanning",
            ScanState::Cropping { .. } => "cropping",
            ScanState::Solving { .. } => "solving",
            ScanState::Result { .. } => "result",
        }
    }

    /// Whether this state needs the camera stream open.
    pub fn uses_camera(&self) -> bool {
        matches!(self, ScanState::Scanning { mode: ScanMode::Camera })
    }

    /// The "Get Solution" button is enabled only for a selection with area.
    pub fn can_submit_crop(&self) -> bool {
        matches!(self, ScanState::Cropping { rect, .. } if rect.has_area())
    }
}

impl ScanEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ScanEvent::StartScan => "start scan",
            ScanEvent::SwitchMode(_) => "switch mode",
            ScanEvent::Capture(_) => "capture",
            ScanEvent::AdjustCrop(_) => "adjust crop",
            ScanEvent::Retake => "retake",
            ScanEvent::SubmitCrop(_) => "submit crop",
            ScanEvent::SubmitText(_) => "submit text",
            ScanEvent::ChangeLanguage(_) => "change language",
            ScanEvent::Completed(_) => "completed",
            ScanEvent::ScanAnother => "scan another",
            ScanEvent::Reset => "reset",
        }
    }
}

fn scanning(mode: ScanMode) -> ScanState {
    ScanState::Scanning { mode }
}

/// Computes the next state. Rejected events leave the caller's state untouched.
pub fn transition(state: &ScanState, event: ScanEvent) -> Result<ScanState, TransitionError> {
    use ScanEvent as E;
    use ScanState as S;

    let next = match (state, event) {
        (_, E::Reset) => S::Welcome,

        (S::Welcome | S::Result { .. }, E::StartScan) => scanning(ScanMode::Camera),
        (S::Result { .. }, E::ScanAnother) => scanning(ScanMode::Camera),

        (S::Scanning { .. }, E::SwitchMode(mode)) => scanning(mode),

        (S::Scanning { mode: ScanMode::Camera }, E::Capture(frame)) => S::Cropping {
            frame,
            rect: CropRect::EMPTY,
        },

        (S::Cropping { frame, .. }, E::AdjustCrop(rect)) => S::Cropping {
            frame: frame.clone(),
            rect,
        },
        (S::Cropping { .. }, E::Retake) => scanning(ScanMode::Camera),
        (S::Cropping { rect, .. }, E::SubmitCrop(question)) => {
            if !rect.has_area() {
                return Err(TransitionError::EmptyCrop);
            }
            if !matches!(question.content, QuestionContent::Image { .. }) {
                return Err(not_allowed(state, "submit crop"));
            }
            S::Solving {
                question,
                previous: None,
            }
        }

        (S::Scanning { mode: ScanMode::Text }, E::SubmitText(question)) => {
            match &question.content {
                QuestionContent::Text { text } if !text.trim().is_empty() => {}
                _ => return Err(TransitionError::EmptyQuestion),
            }
            S::Solving {
                question,
                previous: None,
            }
        }

        (
            S::Result {
                question,
                solution,
                ..
            },
            E::ChangeLanguage(language),
        ) => {
            let solution = solution.clone().ok_or(TransitionError::NothingToTranslate)?;
            S::Solving {
                question: question.in_language(language),
                previous: Some(Answered {
                    question: question.clone(),
                    solution,
                }),
            }
        }

        (S::Solving { question, previous }, E::Completed(outcome)) => match (outcome, previous) {
            (Ok(solution), _) => S::Result {
                question: question.clone(),
                solution: Some(solution),
                error: None,
            },
            (Err(error), Some(previous)) => S::Result {
                question: previous.question.clone(),
                solution: Some(previous.solution.clone()),
                error: Some(error),
            },
            (Err(error), None) => S::Result {
                question: question.clone(),
                solution: None,
                error: Some(error),
            },
        },

        (state, event) => return Err(not_allowed(state, event.name())),
    };

    Ok(next)
}

fn not_allowed(state: &ScanState, event: &'static str) -> TransitionError {
    TransitionError::NotAllowed {
        state: state.name(),
        event,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::ImageSize;
    use crate::domain::Subject;

    fn frame() -> CapturedFrame {
        CapturedFrame {
            data_uri: "data:image/jpeg;base64,AAAA".to_string(),
            natural: ImageSize::new(1280, 720),
            displayed: ImageSize::new(640, 360),
        }
    }

    fn image_question(language: Language) -> Question {
        Question {
            content: QuestionContent::Image {
                data_uri: "data:image/jpeg;base64,BBBB".to_string(),
            },
            subject: Subject::Physics,
            language,
        }
    }

    fn text_question(text: &str) -> Question {
        Question {
            content: QuestionContent::Text {
                text: text.to_string(),
            },
            subject: Subject::Mathematics,
            language: Language::En,
        }
    }

    fn solution(topic: &str) -> SolutionResult {
        SolutionResult {
            identified_subject: Subject::Physics,
            topic: topic.to_string(),
            solution: "F = ma".to_string(),
            formulas: None,
            chart_data: None,
            youtube_video_id: None,
            youtube_video_thumbnail: None,
        }
    }

    fn run(events: Vec<ScanEvent>) -> Result<ScanState, TransitionError> {
        events
            .into_iter()
            .try_fold(ScanState::Welcome, |state, event| transition(&state, event))
    }

    #[test]
    fn camera_path_reaches_result() {
        let state = run(vec![
            ScanEvent::StartScan,
            ScanEvent::Capture(frame()),
            ScanEvent::AdjustCrop(CropRect::new(0.1, 0.1, 0.5, 0.5)),
            ScanEvent::SubmitCrop(image_question(Language::En)),
            ScanEvent::Completed(Ok(solution("Dynamics"))),
        ])
        .unwrap();

        match state {
            ScanState::Result {
                solution, error, ..
            } => {
                assert_eq!(solution.unwrap().topic, "Dynamics");
                assert_eq!(error, None);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn zero_area_crop_cannot_be_submitted() {
        let cropping = run(vec![ScanEvent::StartScan, ScanEvent::Capture(frame())]).unwrap();
        assert!(!cropping.can_submit_crop());
        assert_eq!(
            transition(&cropping, ScanEvent::SubmitCrop(image_question(Language::En))),
            Err(TransitionError::EmptyCrop)
        );

        let selected = transition(
            &cropping,
            ScanEvent::AdjustCrop(CropRect::new(0.0, 0.0, 0.3, 0.2)),
        )
        .unwrap();
        assert!(selected.can_submit_crop());
    }

    #[test]
    fn text_path_skips_cropping() {
        let state = run(vec![
            ScanEvent::StartScan,
            ScanEvent::SwitchMode(ScanMode::Text),
            ScanEvent::SubmitText(text_question("What is 2 + 2?")),
        ])
        .unwrap();
        assert_eq!(state.name(), "solving");

        let text_mode = run(vec![ScanEvent::StartScan, ScanEvent::SwitchMode(ScanMode::Text)]).unwrap();
        assert_eq!(
            transition(&text_mode, ScanEvent::SubmitText(text_question("   "))),
            Err(TransitionError::EmptyQuestion)
        );
        assert!(matches!(
            transition(&text_mode, ScanEvent::Capture(frame())),
            Err(TransitionError::NotAllowed { .. })
        ));
    }

    #[test]
    fn retake_returns_to_the_camera() {
        let state = run(vec![
            ScanEvent::StartScan,
            ScanEvent::Capture(frame()),
            ScanEvent::Retake,
        ])
        .unwrap();
        assert!(state.uses_camera());
    }

    #[test]
    fn failed_solve_still_reaches_result() {
        let state = run(vec![
            ScanEvent::StartScan,
            ScanEvent::SwitchMode(ScanMode::Text),
            ScanEvent::SubmitText(text_question("Why is the sky blue?")),
            ScanEvent::Completed(Err("Network error".to_string())),
        ])
        .unwrap();
        assert_eq!(
            state,
            ScanState::Result {
                question: text_question("Why is the sky blue?"),
                solution: None,
                error: Some("Network error".to_string()),
            }
        );
    }

    #[test]
    fn language_change_keeps_previous_solution_until_replaced() {
        let shown = ScanState::Result {
            question: image_question(Language::En),
            solution: Some(solution("Dynamics")),
            error: None,
        };

        let solving = transition(&shown, ScanEvent::ChangeLanguage(Language::Hi)).unwrap();
        match &solving {
            ScanState::Solving { question, previous } => {
                assert_eq!(question, &image_question(Language::Hi));
                assert_eq!(previous.as_ref().unwrap().solution.topic, "Dynamics");
            }
            other => panic!("unexpected state {:?}", other),
        }

        let failed = transition(&solving, ScanEvent::Completed(Err("Quota exceeded".to_string()))).unwrap();
        assert_eq!(
            failed,
            ScanState::Result {
                question: image_question(Language::En),
                solution: Some(solution("Dynamics")),
                error: Some("Quota exceeded".to_string()),
            }
        );

        let translated = transition(&solving, ScanEvent::Completed(Ok(solution("गतिकी")))).unwrap();
        match translated {
            ScanState::Result { question, solution, .. } => {
                assert_eq!(question.language, Language::Hi);
                assert_eq!(solution.unwrap().topic, "गतिकी");
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn reset_and_scan_another() {
        let result = ScanState::Result {
            question: text_question("1 + 1"),
            solution: None,
            error: Some("boom".to_string()),
        };
        assert_eq!(
            transition(&result, ScanEvent::ScanAnother).unwrap(),
            ScanState::Scanning { mode: ScanMode::Camera }
        );
        assert_eq!(
            transition(&result, ScanEvent::ChangeLanguage(Language::Hi)),
            Err(TransitionError::NothingToTranslate)
        );

        let cropping = run(vec![ScanEvent::StartScan, ScanEvent::Capture(frame())]).unwrap();
        assert_eq!(transition(&cropping, ScanEvent::Reset).unwrap(), ScanState::Welcome);
        assert!(transition(&ScanState::Welcome, ScanEvent::Retake).is_err());
    }
}
