//! Projection of a transcript into plain text, Markdown source and
//! sanitized HTML.

pub mod escape;
pub mod math;
pub mod sanitize;

use crate::theme::render_document;
use crate::types::{Content, Part, Role, ThemeMode, Turn};
use comrak::{ComrakOptions, markdown_to_html};
use escape::{Escaped, escape_html, escape_markdown_source};
use once_cell::sync::Lazy;
use regex::Regex;
use std::panic::{self, AssertUnwindSafe};

pub use sanitize::sanitize_html;

pub const TURN_SEPARATOR: &str = "\n\n---\n\n";

static MARKDOWN_OPTIONS: Lazy<ComrakOptions> = Lazy::new(|| {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.description_lists = true;
    options.render.hardbreaks = true;
    options.render.unsafe_ = false;
    options
});

static BLOCK_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:#{1,6}|[-*+]|[0-9]{1,9}[.)])\s+").expect("block marker pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedView {
    pub plain_text: String,
    pub markdown_source: String,
    pub sanitized_html: String,
}

/// Accumulates the Markdown and plain-text projections turn by turn.
#[derive(Clone, Debug, Default)]
pub struct Renderer {
    theme: ThemeMode,
    markdown: String,
    /// Byte offsets where each turn's block starts in `markdown`.
    block_starts: Vec<usize>,
    plain_text: String,
}

impl Renderer {
    pub fn new(theme: ThemeMode) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    /// Regenerates every projection from history alone.
    pub fn from_turns<'a>(theme: ThemeMode, turns: impl IntoIterator<Item = &'a Turn>) -> Self {
        let mut renderer = Self::new(theme);
        for turn in turns {
            renderer.push_turn(turn);
        }
        renderer
    }

    /// Uses previously saved Markdown for the Markdown and HTML views; the
    /// plain-text view is rebuilt from `turns`.
    pub fn from_markdown<'a>(
        theme: ThemeMode,
        markdown: String,
        turns: impl IntoIterator<Item = &'a Turn>,
    ) -> Self {
        let mut renderer = Self::new(theme);
        for turn in turns {
            push_plain_text(&mut renderer.plain_text, turn);
        }
        renderer.block_starts = recover_block_starts(&markdown);
        renderer.markdown = markdown;
        renderer
    }

    pub fn push_turn(&mut self, turn: &Turn) {
        self.block_starts.push(self.markdown.len());
        self.markdown.push_str(&turn_markdown(turn));
        push_plain_text(&mut self.plain_text, turn);
    }

    pub fn clear(&mut self) {
        self.markdown.clear();
        self.block_starts.clear();
        self.plain_text.clear();
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.theme = theme;
    }

    pub fn markdown_source(&self) -> &str {
        &self.markdown
    }

    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    /// Sanitized HTML fragment for the whole transcript. Each turn block is
    /// converted on its own, so no construct in one turn reaches the next.
    pub fn body_html(&self) -> String {
        let mut html = String::new();
        for (index, block) in self.blocks().enumerate() {
            match try_convert(block) {
                Some(converted) => html.push_str(&converted),
                None => {
                    tracing::warn!(
                        block = index,
                        "markdown conversion failed, using preformatted text"
                    );
                    html.push_str(&fallback_block(block));
                }
            }
        }
        sanitize_html(&html)
    }

    /// Full themed document wrapping [`Renderer::body_html`].
    pub fn sanitized_html(&self) -> String {
        render_document(self.theme, &self.body_html())
    }

    pub fn view(&self) -> RenderedView {
        RenderedView {
            plain_text: self.plain_text.clone(),
            markdown_source: self.markdown.clone(),
            sanitized_html: self.sanitized_html(),
        }
    }

    fn blocks(&self) -> impl Iterator<Item = &str> {
        let ends = self
            .block_starts
            .iter()
            .skip(1)
            .copied()
            .chain(std::iter::once(self.markdown.len()));
        self.block_starts
            .iter()
            .copied()
            .zip(ends)
            .map(|(start, end)| &self.markdown[start..end])
    }
}

/// Block offsets of previously saved Markdown: every separator followed by a
/// role heading starts a new block.
fn recover_block_starts(markdown: &str) -> Vec<usize> {
    if markdown.is_empty() {
        return Vec::new();
    }
    let boundary = format!("{TURN_SEPARATOR}### ");
    std::iter::once(0)
        .chain(
            markdown
                .match_indices(&boundary)
                .map(|(index, _)| index + TURN_SEPARATOR.len()),
        )
        .collect()
}

/// Markdown block for one turn: role heading, escaped body, separator.
pub fn turn_markdown(turn: &Turn) -> String {
    let body = match &turn.content {
        Content::Text(text) => role_body(turn.role, text),
        Content::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => role_body(turn.role, text),
                Part::Attachment(attachment) => escape_html(&format!(
                    "<{}>: {}",
                    attachment.mime_type,
                    attachment.file_name()
                )),
            })
            .filter(|body| !body.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
    };
    format!("### {}\n\n{}{}", turn.role.heading(), body, TURN_SEPARATOR)
}

fn role_body(role: Role, raw: &str) -> String {
    let marker = match role {
        Role::System => "*",
        Role::Error => "**",
        Role::User | Role::Model => "",
    };
    escape_markdown_source(raw.trim_end())
        .into_iter()
        .map(|segment| match segment {
            Escaped::Code(code) => code,
            Escaped::Text(text) if marker.is_empty() => text,
            Escaped::Text(text) => emphasize_lines(&text, marker),
        })
        .collect()
}

/// Wraps the inline text of each line, leaving heading and list markers in
/// front of the emphasis.
fn emphasize_lines(text: &str, marker: &str) -> String {
    text.split('\n')
        .map(|line| {
            let (prefix, rest) = match BLOCK_MARKER.find(line) {
                Some(found) => line.split_at(found.end()),
                None => ("", line),
            };
            let rest = rest.trim();
            if rest.is_empty() {
                line.to_string()
            } else {
                format!("{prefix}{marker}{rest}{marker}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Plain-text line for one turn, e.g. `[Model]: reply`.
pub fn turn_plain_text(turn: &Turn) -> String {
    let text = match &turn.content {
        Content::Text(text) => text.clone(),
        Content::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => text.clone(),
                Part::Attachment(attachment) => {
                    format!("<{}>: {}", attachment.mime_type, attachment.file_name())
                }
            })
            .collect::<Vec<_>>()
            .join(" | "),
    };
    format!("{}: {}", turn.role.bracket_label(), text)
}

fn push_plain_text(out: &mut String, turn: &Turn) {
    out.push_str(&turn_plain_text(turn));
    out.push('\n');
}

/// Converts Markdown to unsanitized HTML with math shielded from the parser.
fn convert(markdown: &str) -> String {
    let protected = math::protect(markdown);
    let html = markdown_to_html(&protected.markdown, &MARKDOWN_OPTIONS);
    math::restore(&html, &protected.spans)
}

fn try_convert(markdown: &str) -> Option<String> {
    panic::catch_unwind(AssertUnwindSafe(|| convert(markdown))).ok()
}

fn fallback_block(markdown: &str) -> String {
    format!(
        "<pre class=\"render-fallback\">{}</pre>\n",
        escape_html(markdown)
    )
}

/// Renders a single stand-alone Markdown string to sanitized HTML.
pub fn markdown_to_sanitized_html(markdown: &str) -> String {
    let html = try_convert(markdown).unwrap_or_else(|| {
        tracing::warn!("markdown conversion failed, using preformatted text");
        fallback_block(markdown)
    });
    sanitize_html(&html)
}
