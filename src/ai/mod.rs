/// AI module for geminichat
///
/// The transcript and renderer never talk to a model directly. The controller
/// creates a [`ChatSession`] over a [`ChatBackend`] and hands it to a worker
/// for each send.
///
/// # Architecture
///
/// - `client` - `ChatBackend` trait, `ChatSession`, outgoing message type
/// - `providers` - Gemini REST client plus Rig-based OpenAI/Anthropic/Ollama
///
/// # Usage
///
/// ```rust,no_run
/// use geminichat::ai::{ChatSession, OutgoingMessage, ProviderClient};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let backend = Arc::new(ProviderClient::from_env()?);
/// let session = ChatSession::create(backend, "Answer briefly.", Vec::new());
/// let (_session, reply) = session.send(OutgoingMessage::text("Hello!")).await;
/// println!("{}", reply?);
/// # Ok(())
/// # }
/// ```
mod client;
mod providers;

// Re-export main types
pub use client::{
    ChatBackend, ChatSession, OutgoingMessage, context_text, restored_attachment_note,
};
pub use providers::{GeminiClient, ProviderClient};
