use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    System,
    Error,
}

impl Role {
    /// Label used in the plain-text transcript.
    pub fn bracket_label(self) -> &'static str {
        match self {
            Role::User => "[You]",
            Role::Model => "[Model]",
            Role::System => "[System]",
            Role::Error => "[Error]",
        }
    }

    /// Heading text used in the Markdown transcript.
    pub fn heading(self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Model => "Model",
            Role::System => "System",
            Role::Error => "Error",
        }
    }

    /// Roles that belong to the conversation context sent to the model.
    pub fn is_context(self) -> bool {
        matches!(self, Role::User | Role::Model)
    }
}

/// A file supplied with a user turn. Only the path is kept; the bytes travel
/// with the outgoing request and are never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub mime_type: String,
    #[serde(rename = "data")]
    pub source_path: PathBuf,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            mime_type: mime_type.into(),
            source_path: source_path.into(),
        }
    }

    pub fn file_name(&self) -> String {
        display_file_name(&self.source_path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text(String),
    Attachment(Attachment),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<Part>),
}

impl Content {
    /// All text parts joined by newlines, attachments skipped.
    pub fn text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    Part::Text(text) if !text.is_empty() => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        let parts: &[Part] = match self {
            Content::Text(_) => &[],
            Content::Parts(parts) => parts,
        };
        parts.iter().filter_map(|part| match part {
            Part::Attachment(attachment) => Some(attachment),
            Part::Text(_) => None,
        })
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    #[serde(rename = "parts")]
    pub content: Content,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(text: impl Into<Content>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<Content>) -> Self {
        Self::new(Role::Model, text)
    }

    pub fn system(text: impl Into<Content>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn error(text: impl Into<Content>) -> Self {
        Self::new(Role::Error, text)
    }

    /// Attachment first, then the accompanying message when there is one.
    pub fn user_with_attachment(attachment: Attachment, text: &str) -> Self {
        let mut parts = vec![Part::Attachment(attachment)];
        if !text.is_empty() {
            parts.push(Part::Text(text.to_string()));
        }
        Self::new(Role::User, Content::Parts(parts))
    }

    pub fn is_context(&self) -> bool {
        self.role.is_context()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }
}

pub fn display_file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
