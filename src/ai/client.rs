use crate::error::ProviderError;
use crate::media::AttachmentPayload;
use crate::types::{Attachment, Content, Part, Turn};
use async_trait::async_trait;
use std::sync::Arc;

/// One user message on its way to the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub attachment: Option<AttachmentPayload>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(text: impl Into<String>, attachment: AttachmentPayload) -> Self {
        Self {
            text: text.into(),
            attachment: Some(attachment),
        }
    }

    /// The user turn recorded for this message (attachment by reference).
    pub fn to_turn(&self) -> Turn {
        match &self.attachment {
            Some(payload) => Turn::user_with_attachment(payload.attachment.clone(), &self.text),
            None => Turn::user(self.text.as_str()),
        }
    }
}

/// A model provider. Implementations must not retry on their own.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        system_instruction: &str,
        history: &[Turn],
        message: &OutgoingMessage,
    ) -> Result<String, ProviderError>;
}

/// Conversation context held for the model: the system instruction plus the
/// user/model turns exchanged so far.
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    system_instruction: String,
    history: Vec<Turn>,
}

impl ChatSession {
    pub fn create(
        backend: Arc<dyn ChatBackend>,
        system_instruction: &str,
        prior_history: impl IntoIterator<Item = Turn>,
    ) -> Self {
        let history: Vec<Turn> = prior_history
            .into_iter()
            .filter(Turn::is_context)
            .collect();
        tracing::debug!(
            backend = backend.name(),
            turns = history.len(),
            "chat session created"
        );
        Self {
            backend,
            system_instruction: system_instruction.trim().to_string(),
            history,
        }
    }

    /// Sends one message. The session is moved in and handed back so only one
    /// request can be outstanding at a time.
    pub async fn send(mut self, message: OutgoingMessage) -> (Self, Result<String, ProviderError>) {
        let result = self
            .backend
            .complete(&self.system_instruction, &self.history, &message)
            .await;
        match &result {
            Ok(reply) => {
                self.history.push(message.to_turn());
                self.history.push(Turn::model(reply.as_str()));
            }
            Err(err) => {
                tracing::warn!(backend = self.backend.name(), error = %err, "send failed");
            }
        }
        (self, result)
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }
}

/// Note sent in place of an attachment whose bytes were not kept.
pub fn restored_attachment_note(attachment: &Attachment) -> String {
    format!(
        "[attachment {} from {} was not resent]",
        attachment.mime_type,
        attachment.source_path.display()
    )
}

/// Flattens a history turn to text for the model context.
pub fn context_text(turn: &Turn) -> String {
    match &turn.content {
        Content::Text(text) => text.clone(),
        Content::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => text.clone(),
                Part::Attachment(attachment) => restored_attachment_note(attachment),
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<Vec<Result<String, ProviderError>>>,
        seen_history: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _system_instruction: &str,
            history: &[Turn],
            _message: &OutgoingMessage,
        ) -> Result<String, ProviderError> {
            self.seen_history.lock().unwrap().push(history.len());
            self.replies.lock().unwrap().remove(0)
        }
    }

    #[tokio::test]
    async fn test_history_grows_only_on_success() {
        let backend = Arc::new(Scripted {
            replies: Mutex::new(vec![
                Ok("first".to_string()),
                Err(ProviderError::new(ProviderErrorKind::Quota, "slow down")),
                Ok("second".to_string()),
            ]),
            seen_history: Mutex::new(Vec::new()),
        });
        let session = ChatSession::create(backend.clone(), " be terse ", Vec::new());
        assert_eq!(session.system_instruction(), "be terse");

        let (session, first) = session.send(OutgoingMessage::text("a")).await;
        assert_eq!(first.unwrap(), "first");
        let (session, failed) = session.send(OutgoingMessage::text("b")).await;
        assert_eq!(failed.unwrap_err().kind, ProviderErrorKind::Quota);
        let (session, _) = session.send(OutgoingMessage::text("c")).await;

        assert_eq!(*backend.seen_history.lock().unwrap(), vec![0, 2, 2]);
        assert_eq!(session.history().len(), 4);
        assert_eq!(session.history()[2], Turn::user("c"));
    }

    #[test]
    fn test_prior_history_drops_annotations() {
        let backend = Arc::new(Scripted {
            replies: Mutex::new(Vec::new()),
            seen_history: Mutex::new(Vec::new()),
        });
        let session = ChatSession::create(
            backend,
            "",
            vec![Turn::user("q"), Turn::error("oops"), Turn::model("a")],
        );
        assert_eq!(session.history(), &[Turn::user("q"), Turn::model("a")]);
    }

    #[test]
    fn test_context_text_notes_missing_attachment() {
        let turn = Turn::user_with_attachment(Attachment::new("image/png", "/tmp/a.png"), "what?");
        assert_eq!(
            context_text(&turn),
            "[attachment image/png from /tmp/a.png was not resent]\nwhat?"
        );
    }
}
