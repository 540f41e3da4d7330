use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```.*?```").expect("fenced block pattern is valid"));

static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`[^`\n]+`").expect("inline code pattern is valid"));

const CODE_MARK: char = '\u{2063}';

static OPEN_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^ {0,3}(`{3,})").expect("open fence pattern is valid"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    Code(&'a str),
    /// A fence opened at the start of a line and never closed.
    Unclosed(&'a str),
    Text(&'a str),
}

/// Splits text into alternating fenced-code and prose segments. A fence opens
/// at the first ``` and closes at the next one.
pub fn split_fenced(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;
    for found in FENCED_BLOCK.find_iter(text) {
        if found.start() > last {
            segments.push(Segment::Text(&text[last..found.start()]));
        }
        segments.push(Segment::Code(found.as_str()));
        last = found.end();
    }
    if last >= text.len() {
        return segments;
    }
    let tail = &text[last..];
    match OPEN_FENCE.find(tail) {
        Some(open) => {
            if open.start() > 0 {
                segments.push(Segment::Text(&tail[..open.start()]));
            }
            segments.push(Segment::Unclosed(&tail[open.start()..]));
        }
        None => segments.push(Segment::Text(tail)),
    }
    segments
}

/// Closes a dangling fence with a run as long as its opener so the block
/// ends where the turn ends.
fn close_fence(code: &str) -> String {
    let run = code
        .trim_start()
        .bytes()
        .take_while(|b| *b == b'`')
        .count();
    format!("{}\n{}", code.trim_end(), "`".repeat(run))
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes `& < >` in prose while leaving inline code spans untouched.
pub fn escape_prose(text: &str) -> String {
    let mut spans: Vec<String> = Vec::new();
    let masked = INLINE_CODE.replace_all(text, |caps: &regex::Captures<'_>| {
        spans.push(caps[0].to_string());
        format!("{CODE_MARK}CODE{}{CODE_MARK}", spans.len() - 1)
    });
    let mut escaped = escape_html(&masked);
    for (index, span) in spans.iter().enumerate().rev() {
        escaped = escaped.replace(&format!("{CODE_MARK}CODE{index}{CODE_MARK}"), span);
    }
    escaped
}

/// Owned result of the escape pass, still split by fence so later stages
/// can treat code blocks differently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Escaped {
    Code(String),
    Text(String),
}

pub fn escape_markdown_source(raw: &str) -> Vec<Escaped> {
    split_fenced(raw)
        .into_iter()
        .map(|segment| match segment {
            Segment::Code(code) => Escaped::Code(code.to_string()),
            Segment::Unclosed(code) => Escaped::Code(close_fence(code)),
            Segment::Text(text) => Escaped::Text(escape_prose(text)),
        })
        .collect()
}
