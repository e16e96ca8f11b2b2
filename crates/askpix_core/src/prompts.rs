//! crates/askpix_core/src/prompts.rs
//!
//! Typed prompt builders. The natural-language templates live in `prompts/`
//! as plain data; each builder takes a parameter struct and returns a complete
//! `ModelRequest`. Placeholders are written `{{name}}`.

use std::path::Path;
use std::sync::Arc;

use crate::domain::{DataUri, DataUriError, Language, QuestionContent, Subject};
use crate::ports::{ContentPart, ModelRequest, OutputFormat, Tool};
use crate::schema;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("Prompt template placeholder '{0}' was not filled")]
    UnfilledPlaceholder(String),
    #[error("Prompt template has an unterminated placeholder")]
    Unterminated,
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] DataUriError),
}

//=========================================================================================
// Templates
//=========================================================================================

const CHAT_SYSTEM: &str = include_str!("../prompts/chat_system.md");
const IDENTIFY_SUBJECT: &str = include_str!("../prompts/identify_subject.md");
const EXTRACT_QUESTION: &str = include_str!("../prompts/extract_question.md");
const SOLVE_QUESTION: &str = include_str!("../prompts/solve_question.md");
const TRANSLATE: &str = include_str!("../prompts/translate.md");

/// The template text for every flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub chat_system: String,
    pub identify_subject: String,
    pub extract_question: String,
    pub solve_question: String,
    pub translate: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            chat_system: CHAT_SYSTEM.to_string(),
            identify_subject: IDENTIFY_SUBJECT.to_string(),
            extract_question: EXTRACT_QUESTION.to_string(),
            solve_question: SOLVE_QUESTION.to_string(),
            translate: TRANSLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    /// The built-in templates, with any same-named file in `dir` taking precedence.
    pub fn with_overrides(dir: &Path) -> std::io::Result<Self> {
        let mut templates = Self::default();
        let slots: [(&str, &mut String); 5] = [
            ("chat_system.md", &mut templates.chat_system),
            ("identify_subject.md", &mut templates.identify_subject),
            ("extract_question.md", &mut templates.extract_question),
            ("solve_question.md", &mut templates.solve_question),
            ("translate.md", &mut templates.translate),
        ];
        for (file_name, slot) in slots {
            let path = dir.join(file_name);
            if path.is_file() {
                *slot = std::fs::read_to_string(&path)?;
                tracing::info!("Loaded prompt override from {}", path.display());
            }
        }
        Ok(templates)
    }
}

/// Fills every `{{name}}` in one pass. Substituted values are never rescanned,
/// so user text containing braces is safe.
pub fn render(template: &str, values: &[(&str, &str)]) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or(PromptError::Unterminated)?;
        let name = after[..end].trim();
        let value = values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| PromptError::UnfilledPlaceholder(name.to_string()))?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

//=========================================================================================
// Parameter Structs
//=========================================================================================

pub struct ChatParams<'a> {
    pub prompt: &'a str,
}

pub struct IdentifySubjectParams<'a> {
    pub question: &'a QuestionContent,
}

pub struct ExtractQuestionParams<'a> {
    pub photo_data_uri: &'a str,
    pub subject: Subject,
}

pub struct SolveQuestionParams<'a> {
    pub question_text: &'a str,
    pub subject: Subject,
    pub language: Language,
}

pub struct TranslateParams<'a> {
    pub text: &'a str,
    pub language: Language,
}

//=========================================================================================
// Builders
//=========================================================================================

fn image_part(data_uri: &str) -> Result<ContentPart, PromptError> {
    let DataUri { mime_type, data } = DataUri::parse(data_uri)?;
    Ok(ContentPart::Image { mime_type, data })
}

impl PromptTemplates {
    pub fn chat(&self, params: &ChatParams<'_>) -> Result<ModelRequest, PromptError> {
        Ok(ModelRequest {
            system: Some(render(&self.chat_system, &[])?),
            parts: vec![ContentPart::Text(params.prompt.to_string())],
            output: OutputFormat::Text,
            tools: Vec::new(),
        })
    }

    pub fn identify_subject(
        &self,
        params: &IdentifySubjectParams<'_>,
    ) -> Result<ModelRequest, PromptError> {
        let parts = match params.question {
            QuestionContent::Text { text } => {
                let question = format!("Question:\n{}", text);
                vec![ContentPart::Text(render(
                    &self.identify_subject,
                    &[("question", &question)],
                )?)]
            }
            QuestionContent::Image { data_uri } => vec![
                ContentPart::Text(render(
                    &self.identify_subject,
                    &[("question", "The question is in the attached photo.")],
                )?),
                image_part(data_uri)?,
            ],
        };

        Ok(ModelRequest {
            system: None,
            parts,
            output: OutputFormat::Json(schema::subject()),
            tools: Vec::new(),
        })
    }

    pub fn extract_question(
        &self,
        params: &ExtractQuestionParams<'_>,
    ) -> Result<ModelRequest, PromptError> {
        let text = render(
            &self.extract_question,
            &[("subject", params.subject.as_str())],
        )?;
        Ok(ModelRequest {
            system: None,
            parts: vec![ContentPart::Text(text), image_part(params.photo_data_uri)?],
            output: OutputFormat::Text,
            tools: Vec::new(),
        })
    }

    pub fn solve_question(
        &self,
        params: &SolveQuestionParams<'_>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<ModelRequest, PromptError> {
        let text = render(
            &self.solve_question,
            &[
                ("subject", params.subject.as_str()),
                ("question", params.question_text),
                ("language", params.language.code()),
                ("language_name", params.language.display_name()),
                ("region", params.language.region_code()),
            ],
        )?;
        Ok(ModelRequest {
            system: None,
            parts: vec![ContentPart::Text(text)],
            output: OutputFormat::Json(schema::solution()),
            tools,
        })
    }

    pub fn translate(&self, params: &TranslateParams<'_>) -> Result<ModelRequest, PromptError> {
        let text = render(
            &self.translate,
            &[
                ("text", params.text),
                ("language", params.language.code()),
                ("language_name", params.language.display_name()),
            ],
        )?;
        Ok(ModelRequest {
            system: None,
            parts: vec![ContentPart::Text(text)],
            output: OutputFormat::Json(schema::translation()),
            tools: Vec::new(),
        })
    }
}
