use crate::ai::{ChatBackend, ChatSession, OutgoingMessage};
use crate::config::Config;
use crate::error::{PersistenceError, ProviderError, ProviderErrorKind};
use crate::media::load_attachment;
use crate::render::{RenderedView, Renderer};
use crate::transcript::{SavedChat, TranscriptStore};
use crate::types::{ThemeMode, Turn};
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub const NOTICE_INSTRUCTION_APPLIED: &str =
    "System instruction updated and the conversation was reset.";
pub const NOTICE_RESET: &str = "The conversation was reset.";
pub const NOTICE_LOADED: &str = "Conversation history loaded.";

/// Owns the transcript, its rendered projections and the model session for
/// one conversation. Views hold a controller and call into it; nothing else
/// mutates the conversation.
pub struct ChatController {
    config: Config,
    backend: Arc<dyn ChatBackend>,
    store: TranscriptStore,
    renderer: Renderer,
    /// `None` only while a request is in flight on the worker.
    session: Option<ChatSession>,
}

impl ChatController {
    pub fn new(config: Config, backend: Arc<dyn ChatBackend>) -> Self {
        let session = ChatSession::create(backend.clone(), "", Vec::new());
        let renderer = Renderer::new(config.theme);
        Self {
            config,
            backend,
            store: TranscriptStore::default(),
            renderer,
            session: Some(session),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &TranscriptStore {
        &self.store
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn view(&self) -> RenderedView {
        self.renderer.view()
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_none()
    }

    fn record(&mut self, turn: Turn) {
        self.renderer.push_turn(&turn);
        self.store.append(turn);
    }

    /// Appends a UI-only `system` annotation.
    pub fn notice(&mut self, text: impl Into<String>) {
        self.record(Turn::system(text.into()));
    }

    /// Sends a text message. Empty input is ignored; returns the reply or
    /// error turn that was appended.
    pub async fn send_text(&mut self, text: &str) -> Option<&Turn> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        self.dispatch(OutgoingMessage::text(trimmed)).await
    }

    /// Gates and reads the file, then sends it with the optional message.
    /// Rejected files produce only a `system` notice.
    pub async fn send_attachment(&mut self, path: &Path, text: &str) -> Option<&Turn> {
        match load_attachment(path) {
            Ok(payload) => {
                self.dispatch(OutgoingMessage::with_attachment(text.trim(), payload))
                    .await
            }
            Err(err) => {
                tracing::info!(path = %path.display(), error = %err, "attachment rejected");
                self.notice(err.to_string());
                None
            }
        }
    }

    async fn dispatch(&mut self, message: OutgoingMessage) -> Option<&Turn> {
        let Some(session) = self.session.take() else {
            tracing::warn!("request already in flight, ignoring send");
            return None;
        };
        self.record(message.to_turn());

        tracing::debug!(
            has_attachment = message.attachment.is_some(),
            "dispatching send"
        );
        let worker = tokio::spawn(session.send(message));
        let (session, result) = match worker.await {
            Ok((session, result)) => (Some(session), result),
            Err(join_error) => (
                None,
                Err(ProviderError::new(
                    ProviderErrorKind::Transport,
                    format!("request worker stopped: {join_error}"),
                )),
            ),
        };

        match result {
            Ok(reply) => self.record(Turn::model(reply)),
            Err(err) => {
                self.store.mark_unanswered();
                self.record(Turn::error(err.to_string()));
            }
        }
        let session = match session {
            Some(session) => session,
            None => self.fresh_session(),
        };
        self.session = Some(session);
        self.store.turns().last()
    }

    fn fresh_session(&self) -> ChatSession {
        ChatSession::create(
            self.backend.clone(),
            self.store.system_instruction(),
            self.store.context().cloned(),
        )
    }

    fn restart(&mut self, system_instruction: Option<String>, notice: &str) {
        let signal = self.store.reset(system_instruction);
        self.session = Some(ChatSession::create(
            self.backend.clone(),
            &signal.system_instruction,
            Vec::new(),
        ));
        self.renderer.clear();
        self.notice(notice);
    }

    /// Replaces the system instruction and starts over.
    pub fn apply_system_instruction(&mut self, instruction: &str) {
        tracing::info!("applying new system instruction");
        self.restart(Some(instruction.to_string()), NOTICE_INSTRUCTION_APPLIED);
    }

    /// Starts over with the current system instruction.
    pub fn reset(&mut self) {
        tracing::info!("resetting conversation");
        self.restart(None, NOTICE_RESET);
    }

    pub fn saved_chat(&self) -> SavedChat {
        self.store.serialize(
            &self.config.model_name,
            Some(self.renderer.markdown_source()),
        )
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        self.saved_chat().save_to_path(path)
    }

    /// Loads a conversation file. On failure the current conversation is left
    /// as it was.
    pub fn load(&mut self, path: &Path) -> Result<(), PersistenceError> {
        let record = SavedChat::load_from_path(path)?;
        self.restore(record);
        Ok(())
    }

    pub fn restore(&mut self, record: SavedChat) {
        let (store, markdown) = TranscriptStore::deserialize(record);
        let theme = self.renderer.theme();
        self.renderer = match markdown {
            Some(markdown) => Renderer::from_markdown(theme, markdown, store.turns()),
            None => Renderer::from_turns(theme, store.turns()),
        };
        self.store = store;
        self.session = Some(self.fresh_session());
        self.notice(NOTICE_LOADED);
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.renderer.set_theme(theme);
    }

    pub fn export_html(&self, path: &Path) -> Result<(), PersistenceError> {
        fs::write(path, self.renderer.sanitized_html()).map_err(|source| PersistenceError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
