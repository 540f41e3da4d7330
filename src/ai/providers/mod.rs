pub mod gemini;

use super::client::{ChatBackend, OutgoingMessage, context_text};
use crate::config::{DEFAULT_GEMINI_MODEL, flag_var, non_empty_var};
use crate::error::{ProviderError, ProviderErrorKind};
use crate::types::{Role, Turn};
use anyhow::Result;
use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Chat;
use rig::providers;

pub use gemini::GeminiClient;

/// Enum to hold different provider clients
pub enum ProviderClient {
    Gemini(GeminiClient),
    OpenAI {
        client: providers::openai::Client,
        model: String,
    },
    Anthropic {
        client: providers::anthropic::Client,
        model: String,
    },
    Ollama {
        client: providers::ollama::Client,
        model: String,
    },
}

impl ProviderClient {
    /// Auto-detect and configure provider from environment variables
    pub fn from_env() -> Result<Self> {
        // Priority order:
        // 1. GEMINI_API_KEY / GENAI_API_KEY → Gemini
        // 2. OPENAI_API_KEY → OpenAI
        // 3. ANTHROPIC_API_KEY → Claude
        // 4. LLM_USE_OLLAMA=true → Ollama
        if let Some(key) = non_empty_var("GEMINI_API_KEY").or_else(|| non_empty_var("GENAI_API_KEY")) {
            let model = non_empty_var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
            let mut client = GeminiClient::new(key, model);
            if let Some(endpoint) = non_empty_var("GEMINI_ENDPOINT") {
                client = client.with_endpoint(endpoint);
            }
            return Ok(Self::Gemini(client));
        }

        if let Some(key) = non_empty_var("OPENAI_API_KEY") {
            return Ok(Self::OpenAI {
                client: providers::openai::Client::new(&key),
                model: non_empty_var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            });
        }

        if let Some(key) = non_empty_var("ANTHROPIC_API_KEY") {
            return Ok(Self::Anthropic {
                client: providers::anthropic::Client::new(&key),
                model: non_empty_var("ANTHROPIC_MODEL")
                    .unwrap_or_else(|| "claude-3-5-sonnet-20241022".to_string()),
            });
        }

        if flag_var("LLM_USE_OLLAMA") {
            // Ollama endpoint is configured via OLLAMA_HOST environment variable
            return Ok(Self::Ollama {
                client: providers::ollama::Client::new(),
                model: non_empty_var("LLM_MODEL").unwrap_or_else(|| "llama3.1:latest".to_string()),
            });
        }

        Err(anyhow::anyhow!(
            "No AI provider configured. Set GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY, or LLM_USE_OLLAMA=true"
        ))
    }
}

#[async_trait]
impl ChatBackend for ProviderClient {
    fn name(&self) -> &str {
        match self {
            ProviderClient::Gemini(_) => "gemini",
            ProviderClient::OpenAI { .. } => "openai",
            ProviderClient::Anthropic { .. } => "anthropic",
            ProviderClient::Ollama { .. } => "ollama",
        }
    }

    async fn complete(
        &self,
        system_instruction: &str,
        history: &[Turn],
        message: &OutgoingMessage,
    ) -> Result<String, ProviderError> {
        let reply = match self {
            ProviderClient::Gemini(client) => {
                return client.generate(system_instruction, history, message).await;
            }
            ProviderClient::OpenAI { client, model } => {
                let (prompt, rig_messages) = rig_inputs(history, message)?;
                let mut builder = client.agent(model).max_tokens(4096).temperature(0.7);
                if !system_instruction.is_empty() {
                    builder = builder.preamble(system_instruction);
                }
                builder.build().chat(prompt.as_str(), rig_messages).await
            }
            ProviderClient::Anthropic { client, model } => {
                let (prompt, rig_messages) = rig_inputs(history, message)?;
                let mut builder = client.agent(model).max_tokens(4096).temperature(0.7);
                if !system_instruction.is_empty() {
                    builder = builder.preamble(system_instruction);
                }
                builder.build().chat(prompt.as_str(), rig_messages).await
            }
            ProviderClient::Ollama { client, model } => {
                let (prompt, rig_messages) = rig_inputs(history, message)?;
                let mut builder = client.agent(model);
                if !system_instruction.is_empty() {
                    builder = builder.preamble(system_instruction);
                }
                builder.build().chat(prompt.as_str(), rig_messages).await
            }
        };
        reply.map_err(|err| ProviderError::new(ProviderErrorKind::Api, err.to_string()))
    }
}

fn rig_inputs(
    history: &[Turn],
    message: &OutgoingMessage,
) -> Result<(String, Vec<rig::message::Message>), ProviderError> {
    Ok((text_prompt(message)?, convert_to_rig_messages(history)))
}

/// Prompt text for text-only backends; text attachments are inlined.
fn text_prompt(message: &OutgoingMessage) -> Result<String, ProviderError> {
    let Some(payload) = &message.attachment else {
        return Ok(message.text.clone());
    };
    let Some(inline) = payload.as_text() else {
        return Err(ProviderError::new(
            ProviderErrorKind::Unsupported,
            format!(
                "{} attachments are only supported by the Gemini backend",
                payload.mime_type()
            ),
        ));
    };
    let name = payload.attachment.file_name();
    Ok(if message.text.is_empty() {
        format!("File {name}:\n\n{inline}")
    } else {
        format!("File {name}:\n\n{inline}\n\n{}", message.text)
    })
}

/// Convert history turns to Rig Message format
fn convert_to_rig_messages(history: &[Turn]) -> Vec<rig::message::Message> {
    history
        .iter()
        .filter(|turn| turn.is_context())
        .map(|turn| {
            let text = context_text(turn);
            match turn.role {
                Role::Model => rig::message::Message::assistant(&text),
                _ => rig::message::Message::user(&text),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::AttachmentPayload;
    use crate::types::Attachment;

    fn payload(mime: &str, bytes: &[u8]) -> AttachmentPayload {
        AttachmentPayload {
            attachment: Attachment::new(mime, "/tmp/notes.txt"),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_text_attachment_is_inlined() {
        let message = OutgoingMessage::with_attachment("summarize", payload("text/plain", b"abc"));
        assert_eq!(
            text_prompt(&message).unwrap(),
            "File notes.txt:\n\nabc\n\nsummarize"
        );
    }

    #[test]
    fn test_binary_attachment_is_unsupported() {
        let message = OutgoingMessage::with_attachment("", payload("image/png", &[0, 1]));
        let err = text_prompt(&message).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Unsupported);
    }

    #[test]
    fn test_rig_history_skips_annotations() {
        let history = vec![Turn::user("q"), Turn::system("note"), Turn::model("a")];
        assert_eq!(convert_to_rig_messages(&history).len(), 2);
    }
}
