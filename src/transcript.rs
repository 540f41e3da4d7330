use crate::error::PersistenceError;
use crate::types::{Role, Turn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};

const SAVE_FILE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]-[hour][minute][second]");

/// On-disk conversation record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedChat {
    #[serde(rename = "modelName", default)]
    pub model_name: String,
    #[serde(default)]
    pub system_instruction: String,
    pub history: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_markdown: Option<String>,
}

impl SavedChat {
    pub fn from_json(raw: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, PersistenceError> {
        let raw = fs::read_to_string(path).map_err(|source| PersistenceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let saved = Self::from_json(&raw)?;
        tracing::info!(path = %path.display(), turns = saved.history.len(), "loaded conversation");
        Ok(saved)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), PersistenceError> {
        if self.history.is_empty() {
            return Err(PersistenceError::EmptyHistory);
        }
        let json = self.to_json_pretty()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PersistenceError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| PersistenceError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), turns = self.history.len(), "saved conversation");
        Ok(())
    }
}

/// What the AI client must be recreated with after a reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResetSignal {
    pub system_instruction: String,
}

/// Ordered, append-only log of turns plus the active system instruction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranscriptStore {
    turns: Vec<Turn>,
    /// Indexes of user turns whose reply failed. They stay visible but are
    /// not part of the context.
    unanswered: Vec<usize>,
    system_instruction: String,
}

impl TranscriptStore {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            turns: Vec::new(),
            unanswered: Vec::new(),
            system_instruction: system_instruction.into(),
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drops the latest user turn from the context after its send failed.
    pub fn mark_unanswered(&mut self) {
        let last_user = self.turns.iter().rposition(|turn| turn.role == Role::User);
        if let Some(index) = last_user
            && !self.unanswered.contains(&index)
        {
            self.unanswered.push(index);
        }
    }

    /// Clears every turn. The instruction is replaced only when one is given.
    pub fn reset(&mut self, system_instruction: Option<String>) -> ResetSignal {
        self.turns.clear();
        self.unanswered.clear();
        if let Some(instruction) = system_instruction {
            self.system_instruction = instruction;
        }
        ResetSignal {
            system_instruction: self.system_instruction.clone(),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Answered user turns and model turns: the resumable client context.
    pub fn context(&self) -> impl Iterator<Item = &Turn> {
        self.turns
            .iter()
            .enumerate()
            .filter(|(index, turn)| turn.is_context() && !self.unanswered.contains(index))
            .map(|(_, turn)| turn)
    }

    pub fn serialize(&self, model_name: &str, markdown: Option<&str>) -> SavedChat {
        SavedChat {
            model_name: model_name.to_string(),
            system_instruction: self.system_instruction.clone(),
            history: self.context().cloned().collect(),
            chat_markdown: markdown.map(str::to_string),
        }
    }

    /// Rebuilds a store from a saved record, returning the stored Markdown
    /// (absent in older files) for the caller to re-render. A user turn not
    /// followed by a model turn is kept for display only.
    pub fn deserialize(record: SavedChat) -> (Self, Option<String>) {
        let turns: Vec<Turn> = record
            .history
            .into_iter()
            .filter(Turn::is_context)
            .collect();
        let unanswered = turns
            .iter()
            .enumerate()
            .filter(|(index, turn)| {
                turn.role == Role::User
                    && turns.get(index + 1).map(|next| next.role) != Some(Role::Model)
            })
            .map(|(index, _)| index)
            .collect();
        let store = Self {
            turns,
            unanswered,
            system_instruction: record.system_instruction,
        };
        (store, record.chat_markdown.filter(|md| !md.is_empty()))
    }
}

/// Default file name for a new save, e.g. `chat-20250301-142233.json`.
pub fn default_save_file_name() -> String {
    let mut now = OffsetDateTime::now_utc();
    if let Ok(offset) = UtcOffset::current_local_offset() {
        now = now.to_offset(offset);
    }
    let stamp = now
        .format(SAVE_FILE_FORMAT)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    format!("chat-{stamp}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_without_argument_keeps_instruction() {
        let mut store = TranscriptStore::new("be brief");
        store.append(Turn::user("hi"));
        let signal = store.reset(None);
        assert!(store.is_empty());
        assert_eq!(signal.system_instruction, "be brief");
    }

    #[test]
    fn test_reset_with_argument_replaces_instruction() {
        let mut store = TranscriptStore::new("old");
        store.append(Turn::model("x"));
        store.reset(Some("new".to_string()));
        assert!(store.is_empty());
        assert_eq!(store.system_instruction(), "new");
    }

    #[test]
    fn test_deserialize_drops_annotation_turns() {
        let record = SavedChat {
            model_name: "Model".into(),
            system_instruction: String::new(),
            history: vec![Turn::user("a"), Turn::system("note"), Turn::model("b")],
            chat_markdown: Some(String::new()),
        };
        let (store, markdown) = TranscriptStore::deserialize(record);
        assert_eq!(store.turns(), &[Turn::user("a"), Turn::model("b")]);
        assert_eq!(markdown, None);
    }

    #[test]
    fn test_unanswered_turn_is_not_context() {
        let mut store = TranscriptStore::new("");
        store.append(Turn::user("lost"));
        store.mark_unanswered();
        store.append(Turn::error("TransportError - timed out"));
        store.append(Turn::user("again"));
        store.append(Turn::model("ok"));

        assert_eq!(store.turns().len(), 4);
        let context: Vec<&Turn> = store.context().collect();
        assert_eq!(context, vec![&Turn::user("again"), &Turn::model("ok")]);
        assert_eq!(
            store.serialize("Model", None).history,
            vec![Turn::user("again"), Turn::model("ok")]
        );
    }

    #[test]
    fn test_reset_forgets_unanswered_marks() {
        let mut store = TranscriptStore::new("");
        store.append(Turn::user("lost"));
        store.mark_unanswered();
        store.reset(None);
        store.append(Turn::user("fresh"));
        assert_eq!(store.context().count(), 1);
    }

    #[test]
    fn test_deserialize_drops_orphan_user_turns_from_context() {
        let record = SavedChat {
            model_name: String::new(),
            system_instruction: String::new(),
            history: vec![
                Turn::user("lost"),
                Turn::user("again"),
                Turn::model("ok"),
                Turn::user("trailing"),
            ],
            chat_markdown: None,
        };
        let (store, _) = TranscriptStore::deserialize(record);
        assert_eq!(store.turns().len(), 4);
        let context: Vec<&Turn> = store.context().collect();
        assert_eq!(context, vec![&Turn::user("again"), &Turn::model("ok")]);
    }

    #[test]
    fn test_missing_history_is_rejected() {
        let err = SavedChat::from_json(r#"{"system_instruction": "x"}"#).unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed(_)));
    }

    #[test]
    fn test_older_file_without_optional_keys() {
        let saved = SavedChat::from_json(r#"{"history": [{"role": "user", "parts": "hi"}]}"#).unwrap();
        assert_eq!(saved.system_instruction, "");
        assert_eq!(saved.chat_markdown, None);
        assert_eq!(saved.history, vec![Turn::user("hi")]);
    }

    #[test]
    fn test_default_save_file_name_shape() {
        let name = default_save_file_name();
        assert!(name.starts_with("chat-"));
        assert!(name.ends_with(".json"));
    }
}
