use crate::types::ThemeMode;

pub struct ThemeDefinition {
    pub css: &'static str,
    pub body_class: &'static str,
}

pub fn theme_definition(mode: ThemeMode) -> ThemeDefinition {
    match mode {
        ThemeMode::Dark => ThemeDefinition {
            css: DARK_THEME,
            body_class: "chat-log chat-log-dark",
        },
        ThemeMode::Light => ThemeDefinition {
            css: LIGHT_THEME,
            body_class: "chat-log",
        },
    }
}

/// Wraps an already sanitized body fragment in a standalone HTML document.
pub fn render_document(mode: ThemeMode, body: &str) -> String {
    let theme = theme_definition(mode);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Chat</title>\n<style>\n{}\n{}\n</style>\n</head>\n<body class=\"{}\">\n{}\n</body>\n</html>\n",
        BASE_CSS, theme.css, theme.body_class, body
    )
}

const BASE_CSS: &str = r#"
body { font: 14px/1.55 -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Hiragino Sans', 'Noto Sans', sans-serif; margin: 0 auto; max-width: 940px; padding: 16px; background: var(--color-bg-primary); color: var(--color-text-primary); }
h3 { font-size: 0.95rem; margin: 12px 0 4px; color: var(--color-text-muted); }
hr { border: none; border-top: 1px solid var(--color-border); margin: 16px 0; }
pre { background: var(--color-code-bg); border: 1px solid var(--color-border); border-radius: 6px; padding: 10px; overflow: auto; }
code { font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, monospace; font-size: 0.95em; }
table { border-collapse: collapse; }
th, td { border: 1px solid var(--color-border); padding: 4px 8px; }
blockquote { border-left: 3px solid var(--color-border); margin: 0; padding-left: 12px; color: var(--color-text-muted); }
a { color: var(--color-link); }
.math { font-family: 'Latin Modern Math', 'STIX Two Math', serif; }
.math.display { display: block; text-align: center; margin: 8px 0; }
.render-fallback { white-space: pre-wrap; }
"#;

const DARK_THEME: &str = r#"
:root {
    --color-bg-primary: #121212;
    --color-text-primary: #eaeaea;
    --color-text-muted: #9b9b9b;
    --color-border: #2a2a2a;
    --color-code-bg: #1e1e1e;
    --color-link: #8ab4f8;
}
"#;

const LIGHT_THEME: &str = r#"
:root {
    --color-bg-primary: #ffffff;
    --color-text-primary: #222222;
    --color-text-muted: #606060;
    --color-border: #d0d0d0;
    --color-code-bg: #f5f5f5;
    --color-link: #1a56db;
}
"#;
