//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the Gemini `generateContent` API.
//! It implements the `GenerativeModel` port from the `core` crate, including the
//! function-calling loop for tools.

use askpix_core::ports::{
    ContentPart, GenerativeModel, ModelRequest, OutputFormat, PortError, PortResult, Tool,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Upper bound on model/tool round trips for one request.
const MAX_TOOL_ROUNDS: usize = 4;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
    /// Fields we do not model (e.g. thought signatures) must be echoed back verbatim.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GenerativeModel` against the Gemini REST API.
#[derive(Clone)]
pub struct GeminiAdapter {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl GeminiAdapter {
    /// Creates a new `GeminiAdapter`. A missing key is reported on first use.
    pub fn new(
        api_base: String,
        api_key: Option<String>,
        model: String,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            api_base,
            api_key,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }

    /// Translates the port-level request into the API's first-turn shape.
    ///
    /// The API rejects JSON mode combined with function calling, so when tools are
    /// present the schema is stated in the instructions instead.
    fn build_initial(request: &ModelRequest) -> (Option<Content>, Vec<Content>, Vec<Value>, Option<Value>) {
        let mut system_text = request.system.clone().unwrap_or_default();
        let mut generation_config = None;

        if let OutputFormat::Json(schema) = &request.output {
            if request.tools.is_empty() {
                generation_config = Some(json!({
                    "responseMimeType": "application/json",
                    "responseSchema": schema,
                }));
            } else {
                if !system_text.is_empty() {
                    system_text.push_str("\n\n");
                }
                system_text.push_str(&format!(
                    "When you are done, reply with only a JSON object matching this schema, without commentary:\n{}",
                    schema
                ));
            }
        }

        let system = (!system_text.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part::text(system_text)],
        });

        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => Part::text(text.clone()),
                ContentPart::Image { mime_type, data } => Part {
                    inline_data: Some(InlineData {
                        mime_type: mime_type.clone(),
                        data: data.clone(),
                    }),
                    ..Default::default()
                },
            })
            .collect();
        let contents = vec![Content {
            role: Some("user".to_string()),
            parts,
        }];

        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.parameters(),
                    })
                })
                .collect();
            vec![json!({ "functionDeclarations": declarations })]
        };

        (system, contents, tools, generation_config)
    }

    async fn call_api(&self, body: &GenerateContentRequest<'_>) -> PortResult<Option<Content>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PortError::Configuration("GEMINI_API_KEY is not configured".to_string()))?;

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Gemini API returned {}: {}",
                status, text
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to parse Gemini response: {}", e)))?;

        Ok(parsed.candidates.into_iter().next().and_then(|c| c.content))
    }
}

/// Runs every function call in `content` and returns the reply turn.
async fn run_tool_calls(tools: &[Arc<dyn Tool>], content: &Content) -> Option<Content> {
    let mut responses = Vec::new();
    for call in content.parts.iter().filter_map(|p| p.function_call.as_ref()) {
        let response = match tools.iter().find(|t| t.name() == call.name) {
            Some(tool) => tool.call(call.args.clone()).await,
            None => {
                warn!("Model called unknown tool '{}'", call.name);
                json!({ "error": format!("Unknown tool '{}'", call.name) })
            }
        };
        responses.push(Part {
            function_response: Some(FunctionResponse {
                name: call.name.clone(),
                response,
            }),
            ..Default::default()
        });
    }

    (!responses.is_empty()).then(|| Content {
        role: Some("user".to_string()),
        parts: responses,
    })
}

fn joined_text(content: &Content) -> String {
    content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

//=========================================================================================
// `GenerativeModel` Trait Implementation
//=========================================================================================

#[async_trait]
impl GenerativeModel for GeminiAdapter {
    async fn generate(&self, request: ModelRequest) -> PortResult<Option<String>> {
        let started = Instant::now();
        let (system_instruction, mut contents, tools, generation_config) =
            Self::build_initial(&request);

        for round in 0..=MAX_TOOL_ROUNDS {
            let body = GenerateContentRequest {
                system_instruction: system_instruction.clone(),
                contents: &contents,
                tools: tools.clone(),
                generation_config: generation_config.clone(),
            };

            let Some(mut reply) = self.call_api(&body).await? else {
                return Ok(None);
            };
            reply.role = Some("model".to_string());

            match run_tool_calls(&request.tools, &reply).await {
                Some(tool_turn) if round < MAX_TOOL_ROUNDS => {
                    info!("Gemini round {} made tool calls", round + 1);
                    contents.push(reply);
                    contents.push(tool_turn);
                }
                Some(_) => {
                    warn!("Gemini kept calling tools after {} rounds", MAX_TOOL_ROUNDS);
                    return Ok(None);
                }
                None => {
                    let text = joined_text(&reply);
                    info!("Gemini ({}) answered in {:?}", self.model, started.elapsed());
                    return Ok((!text.trim().is_empty()).then_some(text));
                }
            }
        }

        Ok(None)
    }
}
