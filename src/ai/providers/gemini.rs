use crate::ai::client::{OutgoingMessage, context_text};
use crate::error::{ProviderError, ProviderErrorKind};
use crate::types::{Role, Turn};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// REST client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    contents: Vec<WireContent>,
}

#[derive(Debug, Serialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum WirePart {
    Text(String),
    InlineData { mime_type: String, data: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model,
            api_key,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(
        &self,
        system_instruction: &str,
        history: &[Turn],
        message: &OutgoingMessage,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = build_request(system_instruction, history, message);
        tracing::debug!(model = %self.model, contents = body.contents.len(), "gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        parse_response(status, &text)
    }
}

fn build_request(
    system_instruction: &str,
    history: &[Turn],
    message: &OutgoingMessage,
) -> GenerateRequest {
    let system_instruction = (!system_instruction.is_empty()).then(|| WireContent {
        role: None,
        parts: vec![WirePart::Text(system_instruction.to_string())],
    });

    let mut contents: Vec<WireContent> = history
        .iter()
        .filter(|turn| turn.is_context())
        .map(|turn| WireContent {
            role: Some(wire_role(turn.role)),
            parts: vec![WirePart::Text(context_text(turn))],
        })
        .collect();

    let mut parts = Vec::new();
    if let Some(payload) = &message.attachment {
        parts.push(WirePart::InlineData {
            mime_type: payload.mime_type().to_string(),
            data: STANDARD.encode(&payload.bytes),
        });
    }
    if !message.text.is_empty() || parts.is_empty() {
        parts.push(WirePart::Text(message.text.clone()));
    }
    contents.push(WireContent {
        role: Some("user"),
        parts,
    });

    GenerateRequest {
        system_instruction,
        contents,
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::Model => "model",
        _ => "user",
    }
}

fn parse_response(status: StatusCode, body: &str) -> Result<String, ProviderError> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body.to_string());
        let kind = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderErrorKind::Authentication,
            StatusCode::TOO_MANY_REQUESTS => ProviderErrorKind::Quota,
            _ => ProviderErrorKind::Api,
        };
        return Err(ProviderError::new(kind, format!("{status}: {message}")));
    }

    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|err| ProviderError::new(ProviderErrorKind::InvalidResponse, err.to_string()))?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|feedback| feedback.block_reason) {
        return Err(ProviderError::new(
            ProviderErrorKind::ContentBlocked,
            format!("prompt blocked: {reason}"),
        ));
    }

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Err(ProviderError::new(
            ProviderErrorKind::InvalidResponse,
            "response contained no candidates",
        ));
    };
    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        let kind = match candidate.finish_reason.as_deref() {
            Some("SAFETY") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
                ProviderErrorKind::ContentBlocked
            }
            _ => ProviderErrorKind::InvalidResponse,
        };
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(ProviderError::new(kind, format!("empty reply (finish reason {reason})")));
    }
    Ok(text)
}
