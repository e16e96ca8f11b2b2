//! crates/askpix_core/src/flows.rs
//!
//! The orchestration flows. Each flow builds a prompt from typed parameters,
//! calls the model once (twice for photos) and parses the structured answer.
//! Nothing here retries: a model that returns nothing usable is reported as
//! `FlowError::NoOutput` to the caller.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::domain::{
    video_thumbnail_url, Language, Question, QuestionContent, SolutionResult, Subject,
};
use crate::ports::{GenerativeModel, PortError, PortResult, SolverClient, Tool, VideoSearchService};
use crate::prompts::{
    ChatParams, ExtractQuestionParams, IdentifySubjectParams, PromptError, PromptTemplates,
    SolveQuestionParams, TranslateParams,
};
use crate::tools::VideoSearchTool;

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Model produced no output.")]
    NoOutput,
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Port(#[from] PortError),
}

pub type FlowResult<T> = Result<T, FlowError>;

impl From<FlowError> for PortError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Port(port) => port,
            other => PortError::Unexpected(other.to_string()),
        }
    }
}

//=========================================================================================
// Flow Inputs
//=========================================================================================

#[derive(Debug, Clone)]
pub struct SolveTextInput {
    pub question_text: String,
    pub subject: Subject,
    pub language: Language,
}

#[derive(Debug, Clone)]
pub struct SolveImageInput {
    pub photo_data_uri: String,
    pub subject: Subject,
    pub language: Language,
}

#[derive(Deserialize)]
struct SubjectOutput {
    subject: Subject,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslationOutput {
    translated_text: String,
}

//=========================================================================================
// Flows
//=========================================================================================

/// All flows, sharing one model, one video search and one template set.
#[derive(Clone)]
pub struct Flows {
    model: Arc<dyn GenerativeModel>,
    videos: Arc<dyn VideoSearchService>,
    templates: Arc<PromptTemplates>,
}

impl Flows {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        videos: Arc<dyn VideoSearchService>,
        templates: Arc<PromptTemplates>,
    ) -> Self {
        Self {
            model,
            videos,
            templates,
        }
    }

    /// Free-form assistant chat.
    pub async fn chat(&self, prompt: &str) -> FlowResult<String> {
        let request = self.templates.chat(&ChatParams { prompt })?;
        let reply = self.model.generate(request).await?;
        non_empty(reply)
    }

    /// Classifies a question into one of the known subjects.
    pub async fn identify_subject(&self, question: &QuestionContent) -> FlowResult<Subject> {
        let request = self
            .templates
            .identify_subject(&IdentifySubjectParams { question })?;
        let raw = self.model.generate(request).await?;
        let output: SubjectOutput = parse_json(&non_empty(raw)?)?;
        Ok(output.subject)
    }

    /// Solves a typed question. The model may call the video search while writing.
    pub async fn solve_text(&self, input: &SolveTextInput) -> FlowResult<SolutionResult> {
        let started = Instant::now();
        let video_tool = Arc::new(VideoSearchTool::new(self.videos.clone()));
        let tools: Vec<Arc<dyn Tool>> = vec![video_tool.clone()];

        let request = self.templates.solve_question(
            &SolveQuestionParams {
                question_text: &input.question_text,
                subject: input.subject,
                language: input.language,
            },
            tools,
        )?;

        let raw = self.model.generate(request).await?;
        let output: SolutionResult = parse_json(&non_empty(raw)?)?;
        let result = finalize_solution(output, video_tool.found())?;

        info!(
            "Solve flow finished in {:?} (hint {}, identified {}, language {})",
            started.elapsed(),
            input.subject,
            result.identified_subject,
            input.language
        );
        Ok(result)
    }

    /// Solves a photographed question in two calls: transcribe the photo to text,
    /// then solve the text exactly as `solve_text` would.
    pub async fn solve_image(&self, input: &SolveImageInput) -> FlowResult<SolutionResult> {
        let started = Instant::now();
        let request = self.templates.extract_question(&ExtractQuestionParams {
            photo_data_uri: &input.photo_data_uri,
            subject: input.subject,
        })?;
        let question_text = non_empty(self.model.generate(request).await?)?;
        info!(
            "Extracted {} characters of question text in {:?}",
            question_text.len(),
            started.elapsed()
        );

        self.solve_text(&SolveTextInput {
            question_text,
            subject: input.subject,
            language: input.language,
        })
        .await
    }

    /// Translates study material, keeping markdown and math intact.
    pub async fn translate(&self, text: &str, language: Language) -> FlowResult<String> {
        let request = self.templates.translate(&TranslateParams { text, language })?;
        let raw = self.model.generate(request).await?;
        let output: TranslationOutput = parse_json(&non_empty(raw)?)?;
        non_empty(Some(output.translated_text))
    }
}

#[async_trait]
impl SolverClient for Flows {
    async fn solve(&self, question: &Question) -> PortResult<SolutionResult> {
        let result = match &question.content {
            QuestionContent::Image { data_uri } => {
                self.solve_image(&SolveImageInput {
                    photo_data_uri: data_uri.clone(),
                    subject: question.subject,
                    language: question.language,
                })
                .await
            }
            QuestionContent::Text { text } => {
                self.solve_text(&SolveTextInput {
                    question_text: text.clone(),
                    subject: question.subject,
                    language: question.language,
                })
                .await
            }
        };
        result.map_err(PortError::from)
    }
}

//=========================================================================================
// Output Handling
//=========================================================================================

fn non_empty(text: Option<String>) -> FlowResult<String> {
    match text.map(|t| t.trim().to_string()) {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(FlowError::NoOutput),
    }
}

/// Parses a JSON answer, tolerating a surrounding markdown code fence.
pub(crate) fn parse_json<T: DeserializeOwned>(raw: &str) -> FlowResult<T> {
    let trimmed = raw.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(fenced) => {
            let without_lang = fenced.split_once('\n').map_or("", |(_, rest)| rest);
            without_lang.trim_end().trim_end_matches("```").trim()
        }
        None => trimmed,
    };

    serde_json::from_str(body).map_err(|e| {
        warn!("Model output did not match the expected schema: {}", e);
        FlowError::NoOutput
    })
}

fn finalize_solution(
    mut output: SolutionResult,
    found_video: Option<String>,
) -> FlowResult<SolutionResult> {
    if output.topic.trim().is_empty() || output.solution.trim().is_empty() {
        return Err(FlowError::NoOutput);
    }

    output.formulas = output.formulas.filter(|f| !f.trim().is_empty());
    output.chart_data = output.chart_data.filter(|chart| !chart.data.is_empty());

    let video_id = output
        .youtube_video_id
        .take()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .or(found_video);
    output.youtube_video_thumbnail = video_id.as_deref().map(video_thumbnail_url);
    output.youtube_video_id = video_id;

    Ok(output)
}
