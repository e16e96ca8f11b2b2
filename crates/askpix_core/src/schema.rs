//! crates/askpix_core/src/schema.rs
//!
//! Output schemas handed to the model for structured answers.
//!
//! Written in the OpenAPI subset the model API accepts (upper-case type names,
//! `nullable` instead of type unions).

use serde_json::{json, Value};

use crate::domain::Subject;

fn subject_enum() -> Value {
    json!({
        "type": "STRING",
        "enum": Subject::ALL.iter().map(Subject::as_str).collect::<Vec<_>>(),
    })
}

pub fn solution() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "identifiedSubject": subject_enum(),
            "topic": { "type": "STRING" },
            "solution": { "type": "STRING" },
            "formulas": { "type": "STRING", "nullable": true },
            "chartData": {
                "type": "OBJECT",
                "nullable": true,
                "properties": {
                    "title": { "type": "STRING" },
                    "xAxisLabel": { "type": "STRING", "nullable": true },
                    "yAxisLabel": { "type": "STRING", "nullable": true },
                    "data": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "name": { "type": "STRING" },
                                "value": { "type": "NUMBER" }
                            },
                            "required": ["name", "value"]
                        }
                    }
                },
                "required": ["title", "data"]
            },
            "youtubeVideoId": { "type": "STRING", "nullable": true }
        },
        "required": ["identifiedSubject", "topic", "solution"]
    })
}

pub fn subject() -> Value {
    json!({
        "type": "OBJECT",
        "properties": { "subject": subject_enum() },
        "required": ["subject"]
    })
}

pub fn translation() -> Value {
    json!({
        "type": "OBJECT",
        "properties": { "translatedText": { "type": "STRING" } },
        "required": ["translatedText"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solution_schema_lists_every_subject() {
        let schema = solution();
        let subjects = schema["properties"]["identifiedSubject"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(subjects.len(), Subject::ALL.len());
        assert_eq!(schema["required"][2], "solution");
    }
}
