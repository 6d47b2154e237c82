//! LLM Client: the single point of entry for all Gemini API calls.
//!
//! No other module talks to the provider directly. Everything goes through the
//! `TextProvider` trait so the opinion pipeline can be exercised without a network.
//!
//! Each call here is a single attempt. Timeouts and retries are owned by
//! `opinions::generation::GenerationClient`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::catalog::{curated_display_name, ModelDescriptor};

pub mod prompts;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const LIST_PAGE_SIZE: u32 = 1000;
/// Tokens reserved for the model's own reasoning before any visible output.
const BASE_OUTPUT_TOKENS: u32 = 2048;
/// Generous upper bound on tokens per requested output character.
const TOKENS_PER_CHAR: u32 = 2;
const TEMPERATURE: f32 = 0.9;

/// Finish reasons that mean the provider refused on content grounds.
const POLICY_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "RECITATION",
    "IMAGE_SAFETY",
];

/// How a provider failure should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Network, timeout, or 5xx-class failure. Eligible for one retry.
    Transient,
    /// The provider blocked the prompt or the output on content grounds.
    Policy,
    /// Rate limit or quota exhausted.
    Quota,
    /// Any other refusal: bad key, unknown model, malformed request.
    Rejected,
}

#[derive(Debug, Clone, Error)]
#[error("{kind:?} provider error: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transient, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ProviderErrorKind::Transient
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => classify_status(status, e.to_string()),
            // connect, timeout, body and decode failures all look like a flaky hop
            None => ProviderError::transient(e.to_string()),
        }
    }
}

/// Maps an HTTP status from the provider onto a failure kind.
pub fn classify_status(status: StatusCode, message: String) -> ProviderError {
    let kind = if status == StatusCode::TOO_MANY_REQUESTS {
        ProviderErrorKind::Quota
    } else if status == StatusCode::REQUEST_TIMEOUT || status.is_server_error() {
        ProviderErrorKind::Transient
    } else {
        ProviderErrorKind::Rejected
    };
    ProviderError::new(kind, format!("status {}: {message}", status.as_u16()))
}

/// The provider capability the opinion pipeline depends on.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Lists generation-capable models in provider order.
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ProviderError>;

    /// Runs one generation call and returns the raw response text.
    async fn generate_text(
        &self,
        model: &str,
        prompt: &str,
        length_hint: u32,
    ) -> Result<String, ProviderError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<RemoteModel>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteModel {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

impl GenerateContentResponse {
    /// Concatenates the visible text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// Returns the block or finish reason when the provider refused on content grounds.
    fn policy_block(&self) -> Option<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Some(reason);
        }
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .filter(|r| POLICY_FINISH_REASONS.contains(r))
            .map(str::to_string)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini client
// ────────────────────────────────────────────────────────────────────────────

/// Gemini REST client. Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl GeminiClient {
    pub fn new(api_key: String, api_base: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn error_from_response(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GeminiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        warn!("Gemini API returned {}: {}", status, message);
        classify_status(status, message)
    }
}

#[async_trait]
impl TextProvider for GeminiClient {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ProviderError> {
        let url = format!("{}/models", self.api_base);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .header("x-goog-api-key", &self.api_key)
                .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(Self::error_from_response(response).await);
            }

            let page: ListModelsResponse = response.json().await?;
            models.extend(page.models.into_iter().filter_map(to_descriptor));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Gemini listed {} generation models", models.len());
        Ok(models)
    }

    async fn generate_text(
        &self,
        model: &str,
        prompt: &str,
        length_hint: u32,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: prompts::JSON_ARRAY_SYSTEM,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_output_tokens(length_hint),
                temperature: TEMPERATURE,
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let payload: GenerateContentResponse = response.json().await?;

        if let Some(usage) = &payload.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={}, output_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        match payload.text() {
            Some(text) => Ok(text),
            None => match payload.policy_block() {
                Some(reason) => Err(ProviderError::new(
                    ProviderErrorKind::Policy,
                    format!("response blocked: {reason}"),
                )),
                // nothing to parse; the parser will report it
                None => Ok(String::new()),
            },
        }
    }
}

/// Output token budget for five opinions of `length_hint` characters each.
pub fn max_output_tokens(length_hint: u32) -> u32 {
    BASE_OUTPUT_TOKENS + length_hint * crate::models::student::OPINION_COUNT as u32 * TOKENS_PER_CHAR
}

/// Keeps text-generation Gemini models and attaches curated labels where known.
fn to_descriptor(model: RemoteModel) -> Option<ModelDescriptor> {
    let name = model.name.strip_prefix("models/").unwrap_or(&model.name);
    let generates = model
        .supported_generation_methods
        .iter()
        .any(|m| m == "generateContent");
    if !generates || !name.starts_with("gemini") {
        return None;
    }

    let display_name = curated_display_name(name)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if model.display_name.is_empty() {
                name.to_string()
            } else {
                model.display_name.clone()
            }
        });

    Some(ModelDescriptor {
        name: name.to_string(),
        full_name: model.name.clone(),
        display_name,
    })
}
