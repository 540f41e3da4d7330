//! Chat transcript model, safe Markdown/HTML rendering and persistence for a
//! hosted generative-AI chat client.

pub mod ai;
pub mod config;
pub mod controller;
pub mod error;
pub mod media;
pub mod render;
pub mod theme;
pub mod transcript;
pub mod types;

pub use controller::ChatController;
pub use render::{RenderedView, Renderer};
pub use transcript::{SavedChat, TranscriptStore};
pub use types::{Attachment, Content, Part, Role, ThemeMode, Turn};
