//! services/api/src/web/validation.rs
//!
//! Field-level request validation. Bodies are read as raw JSON and checked
//! field by field, so one response can report every problem at once.

use askpix_core::domain::{DataUri, Language, Subject};
use axum::{
    extract::{FromRequest, Request},
    Json,
};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::web::error::HttpError;

/// Problems found per field, keyed by the wire (camelCase) field name.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

const DATA_URI_MESSAGE: &str =
    "Expected a data URI of the form 'data:<mimetype>;base64,<encoded_data>'";

fn data_uri_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^data:[\w.+-]+/[\w.+-]+;base64,[A-Za-z0-9+/]+={0,2}$").ok())
        .as_ref()
}

fn is_data_uri(value: &str) -> bool {
    match data_uri_pattern() {
        Some(pattern) => pattern.is_match(value),
        None => DataUri::parse(value).is_ok(),
    }
}

fn enum_message<T: Display>(options: impl IntoIterator<Item = T>, received: &str) -> String {
    let expected = options
        .into_iter()
        .map(|o| format!("'{}'", o))
        .collect::<Vec<_>>()
        .join(" | ");
    format!("Invalid enum value. Expected {}, received '{}'", expected, received)
}

//=========================================================================================
// Field Reader
//=========================================================================================

/// Reads typed fields out of a JSON object, collecting an error for every bad field.
pub struct FieldReader<'a> {
    body: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    pub fn new(body: &'a Value) -> Result<Self, HttpError> {
        let body = body.as_object().ok_or_else(|| {
            HttpError::BadRequest("Request body must be a JSON object.".to_string())
        })?;
        Ok(Self {
            body,
            errors: FieldErrors::default(),
        })
    }

    pub fn has(&self, field: &str) -> bool {
        !matches!(self.body.get(field), None | Some(Value::Null))
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// A string that may be absent or null. Present values must be strings.
    pub fn optional_string(&mut self, field: &str) -> Option<String> {
        match self.body.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.reject(field, "Expected string");
                None
            }
        }
    }

    /// A required, non-blank string.
    pub fn string(&mut self, field: &str) -> Option<String> {
        if !self.has(field) {
            self.reject(field, "Required");
            return None;
        }
        let value = self.optional_string(field)?;
        if value.trim().is_empty() {
            self.reject(field, "Must not be empty");
            return None;
        }
        Some(value)
    }

    pub fn data_uri(&mut self, field: &str) -> Option<String> {
        let value = self.string(field)?;
        self.check_data_uri(field, value)
    }

    pub fn optional_data_uri(&mut self, field: &str) -> Option<String> {
        let value = self.optional_string(field)?;
        self.check_data_uri(field, value)
    }

    fn check_data_uri(&mut self, field: &str, value: String) -> Option<String> {
        if is_data_uri(&value) {
            Some(value)
        } else {
            self.reject(field, DATA_URI_MESSAGE);
            None
        }
    }

    fn parsed<T: FromStr>(&mut self, field: &str, message: impl FnOnce(&str) -> String) -> Option<T> {
        let raw = self.string(field)?;
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.reject(field, message(&raw));
                None
            }
        }
    }

    pub fn subject(&mut self, field: &str) -> Option<Subject> {
        self.parsed(field, |raw| enum_message(Subject::ALL, raw))
    }

    pub fn language(&mut self, field: &str) -> Option<Language> {
        self.parsed(field, |raw| enum_message(Language::ALL, raw))
    }

    /// Ends reading. Fails with every collected field error, if any.
    pub fn finish(self) -> Result<(), HttpError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(HttpError::Validation(self.errors))
        }
    }
}

//=========================================================================================
// The `Validated` Extractor
//=========================================================================================

/// A request type built from a JSON body field by field.
pub trait Validate: Sized {
    /// Returns `None` when any field was rejected on the reader.
    fn validate(body: &mut FieldReader<'_>) -> Option<Self>;
}

/// Extracts `T` from a JSON body, answering 400 with per-field details on failure.
pub struct Validated<T>(pub T);

impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: Validate,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| HttpError::BadRequest(rejection.body_text()))?;

        let mut reader = FieldReader::new(&body)?;
        let value = T::validate(&mut reader);
        reader.finish()?;
        value
            .map(Validated)
            .ok_or_else(|| HttpError::BadRequest("Invalid input".to_string()))
    }
}
