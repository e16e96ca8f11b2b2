//! crates/askpix_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Wire names are camelCase; subjects travel as their display names and
//! languages as their two-letter codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::PortError;

//=========================================================================================
// Subject & Language
//=========================================================================================

/// The academic category of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Mathematics,
    Physics,
    Chemistry,
    Biology,
    General,
}

impl Subject {
    pub const ALL: [Subject; 5] = [
        Subject::Mathematics,
        Subject::Physics,
        Subject::Chemistry,
        Subject::Biology,
        Subject::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Mathematics => "Mathematics",
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Biology => "Biology",
            Subject::General => "General",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subject::ALL
            .into_iter()
            .find(|subject| subject.as_str() == s)
            .ok_or_else(|| format!("unknown subject '{}'", s))
    }
}

/// The language a solution is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Hi,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Hi];

    /// The two-letter code used on the wire and by the video search.
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
        }
    }

    /// The human-readable name embedded in prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "Hindi",
        }
    }

    /// The two-letter region code whose videos suit speakers of this language.
    pub fn region_code(&self) -> &'static str {
        match self {
            Language::En => "US",
            Language::Hi => "IN",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| language.code() == s)
            .ok_or_else(|| format!("unknown language '{}'", s))
    }
}

//=========================================================================================
// Data URIs
//=========================================================================================

/// A base64 image embedded in a string, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected a data URI of the form 'data:<mimetype>;base64,<data>'")]
pub struct DataUriError;

impl DataUri {
    pub fn parse(uri: &str) -> Result<Self, DataUriError> {
        let rest = uri.strip_prefix("data:").ok_or(DataUriError)?;
        let (mime_type, data) = rest.split_once(";base64,").ok_or(DataUriError)?;
        if mime_type.is_empty() || !mime_type.contains('/') || data.is_empty() {
            return Err(DataUriError);
        }
        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }

    pub fn to_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

//=========================================================================================
// Questions
//=========================================================================================

/// What the user submitted: a cropped photo or typed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QuestionContent {
    Image {
        #[serde(rename = "photoDataUri")]
        data_uri: String,
    },
    Text {
        #[serde(rename = "questionText")]
        text: String,
    },
}

/// A submitted question. Immutable once built; a language change builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub content: QuestionContent,
    pub subject: Subject,
    pub language: Language,
}

impl Question {
    /// The same question asked in another language.
    pub fn in_language(&self, language: Language) -> Self {
        Self {
            content: self.content.clone(),
            subject: self.subject,
            language,
        }
    }

    /// The cropped image, when the question came from the camera.
    pub fn image(&self) -> Option<&str> {
        match &self.content {
            QuestionContent::Image { data_uri } => Some(data_uri),
            QuestionContent::Text { .. } => None,
        }
    }
}

//=========================================================================================
// Solutions
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis_label: Option<String>,
    #[serde(default)]
    pub data: Vec<ChartPoint>,
}

/// The structured answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionResult {
    pub identified_subject: Subject,
    pub topic: String,
    /// Markdown with math markup.
    pub solution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formulas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<ChartData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_video_thumbnail: Option<String>,
}

/// The thumbnail URL for a video id.
pub fn video_thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)
}

//=========================================================================================
// Saved Solutions
//=========================================================================================

/// A solution persisted under a user. Carries the subject pair and language
/// in effect when it was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSolution {
    pub id: Uuid,
    pub cropped_image: Option<String>,
    pub topic: String,
    pub solution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formulas: Option<String>,
    pub subject: Subject,
    pub identified_subject: Subject,
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_video_thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A saved solution before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSavedSolution {
    pub cropped_image: Option<String>,
    pub topic: String,
    pub solution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formulas: Option<String>,
    pub subject: Subject,
    pub identified_subject: Subject,
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_video_thumbnail: Option<String>,
}

impl NewSavedSolution {
    /// Snapshots a result together with the question it answered.
    pub fn from_result(question: &Question, result: &SolutionResult) -> Self {
        Self {
            cropped_image: question.image().map(str::to_string),
            topic: result.topic.clone(),
            solution: result.solution.clone(),
            formulas: result.formulas.clone(),
            subject: question.subject,
            identified_subject: result.identified_subject,
            language: question.language,
            youtube_video_id: result.youtube_video_id.clone(),
            youtube_video_thumbnail: result.youtube_video_thumbnail.clone(),
        }
    }

    /// Rejects a cropped image too big for a single stored document.
    pub fn ensure_image_within(&self, max_bytes: usize) -> Result<(), PortError> {
        match &self.cropped_image {
            Some(image) if image.len() > max_bytes => Err(PortError::PayloadTooLarge),
            _ => Ok(()),
        }
    }

    pub fn into_saved(self, id: Uuid, created_at: DateTime<Utc>) -> SavedSolution {
        SavedSolution {
            id,
            cropped_image: self.cropped_image,
            topic: self.topic,
            solution: self.solution,
            formulas: self.formulas,
            subject: self.subject,
            identified_subject: self.identified_subject,
            language: self.language,
            youtube_video_id: self.youtube_video_id,
            youtube_video_thumbnail: self.youtube_video_thumbnail,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_and_languages_use_wire_names() {
        assert_eq!(serde_json::to_string(&Subject::Mathematics).unwrap(), "\"Mathematics\"");
        assert_eq!(serde_json::to_string(&Language::Hi).unwrap(), "\"hi\"");
        assert_eq!("Biology".parse::<Subject>().unwrap(), Subject::Biology);
        assert!("mathematics".parse::<Subject>().is_err());
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn data_uri_splits_mime_and_payload() {
        let uri = DataUri::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(uri.mime_type, "image/png");
        assert_eq!(uri.data, "iVBORw0KGgo=");
        assert_eq!(uri.to_uri(), "data:image/png;base64,iVBORw0KGgo=");

        assert!(DataUri::parse("http://example.com/a.png").is_err());
        assert!(DataUri::parse("data:image/png,raw").is_err());
        assert!(DataUri::parse("data:;base64,abc").is_err());
    }

    #[test]
    fn solution_omits_absent_optional_fields() {
        let result = SolutionResult {
            identified_subject: Subject::Physics,
            topic: "Kinematics".to_string(),
            solution: "v = u + at".to_string(),
            formulas: None,
            chart_data: None,
            youtube_video_id: None,
            youtube_video_thumbnail: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["identifiedSubject"], "Physics");
        assert!(json.get("formulas").is_none());
        assert!(json.get("youtubeVideoId").is_none());
    }

    #[test]
    fn saved_solution_keeps_the_question_subject_and_language() {
        let question = Question {
            content: QuestionContent::Image {
                data_uri: "data:image/jpeg;base64,AAAA".to_string(),
            },
            subject: Subject::Physics,
            language: Language::Hi,
        };
        let result = SolutionResult {
            identified_subject: Subject::Chemistry,
            topic: "Moles".to_string(),
            solution: "n = m / M".to_string(),
            formulas: Some("n = m/M".to_string()),
            chart_data: None,
            youtube_video_id: None,
            youtube_video_thumbnail: None,
        };

        let new = NewSavedSolution::from_result(&question, &result);
        assert_eq!(new.subject, Subject::Physics);
        assert_eq!(new.identified_subject, Subject::Chemistry);
        assert_eq!(new.language, Language::Hi);
        assert_eq!(new.cropped_image.as_deref(), Some("data:image/jpeg;base64,AAAA"));
    }

    #[test]
    fn oversized_images_are_rejected() {
        let mut new = NewSavedSolution {
            cropped_image: Some("x".repeat(11)),
            topic: "t".to_string(),
            solution: "s".to_string(),
            formulas: None,
            subject: Subject::General,
            identified_subject: Subject::General,
            language: Language::En,
            youtube_video_id: None,
            youtube_video_thumbnail: None,
        };
        assert!(matches!(new.ensure_image_within(10), Err(PortError::PayloadTooLarge)));
        assert!(new.ensure_image_within(11).is_ok());
        new.cropped_image = None;
        assert!(new.ensure_image_within(0).is_ok());
    }
}
