use crate::types::ThemeMode;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_MODEL_NAME: &str = "Model";

/// Runtime settings read from the environment (after `.env` is loaded).
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Display name written as `modelName` in saved files.
    pub model_name: String,
    pub theme: ThemeMode,
    pub save_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            theme: ThemeMode::default(),
            save_dir: default_save_dir(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let model_name = non_empty_var("GEMINICHAT_MODEL_NAME").unwrap_or(defaults.model_name);
        let theme = match non_empty_var("GEMINICHAT_THEME") {
            Some(raw) => ThemeMode::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "unknown GEMINICHAT_THEME, using light");
                ThemeMode::Light
            }),
            None => defaults.theme,
        };
        let save_dir = non_empty_var("GEMINICHAT_SAVE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.save_dir);

        Self {
            model_name,
            theme,
            save_dir,
        }
    }
}

fn default_save_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geminichat")
}

/// Reads an environment variable, treating blank values as unset.
pub(crate) fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Truthy flag values used by provider toggles.
pub(crate) fn flag_var(key: &str) -> bool {
    matches!(
        env::var(key)
            .unwrap_or_else(|_| "false".into())
            .to_ascii_lowercase()
            .as_str(),
        "1" | "true" | "yes" | "on"
    )
}
