//! Shields `$...$` and `$$...$$` expressions from the Markdown processor.
//!
//! Each expression is swapped for an opaque token before conversion and put
//! back into the generated HTML afterwards, so emphasis markers and
//! underscores inside formulas are never interpreted.

use super::escape::{Segment, split_fenced};
use once_cell::sync::Lazy;
use regex::Regex;

const MARK: char = '\u{2063}';

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{2063}MATH([0-9]+)\u{2063}").expect("math token pattern is valid"));

static BLANK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n").expect("blank line pattern is valid"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MathSpan {
    pub display: bool,
    /// Original text including its `$` delimiters.
    pub source: String,
}

#[derive(Debug, Default)]
pub struct Protected {
    pub markdown: String,
    pub spans: Vec<MathSpan>,
}

pub fn protect(markdown: &str) -> Protected {
    let mut protected = Protected::default();
    for segment in split_fenced(markdown) {
        match segment {
            Segment::Code(code) | Segment::Unclosed(code) => protected.markdown.push_str(code),
            Segment::Text(text) => protect_prose(text, &mut protected),
        }
    }
    protected
}

fn protect_prose(text: &str, out: &mut Protected) {
    let bytes = text.as_bytes();
    let mut last = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'`' => {
                i = skip_code_span(bytes, i);
            }
            b'$' if bytes.get(i + 1) == Some(&b'$') => match find_display_end(text, i + 2) {
                Some(end) => {
                    out.markdown.push_str(&text[last..i]);
                    push_token(out, true, &text[i..end]);
                    last = end;
                    i = end;
                }
                None => i += 2,
            },
            b'$' => match find_inline_end(bytes, i) {
                Some(end) => {
                    out.markdown.push_str(&text[last..i]);
                    push_token(out, false, &text[i..end]);
                    last = end;
                    i = end;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    out.markdown.push_str(&text[last..]);
}

fn push_token(out: &mut Protected, display: bool, source: &str) {
    out.markdown
        .push_str(&format!("{MARK}MATH{}{MARK}", out.spans.len()));
    out.spans.push(MathSpan {
        display,
        source: source.to_string(),
    });
}

/// Returns the index just past a backtick run and its matching closer.
fn skip_code_span(bytes: &[u8], start: usize) -> usize {
    let run = bytes[start..].iter().take_while(|b| **b == b'`').count();
    let mut i = start + run;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let closing = bytes[i..].iter().take_while(|b| **b == b'`').count();
            if closing == run {
                return i + closing;
            }
            i += closing;
        } else {
            i += 1;
        }
    }
    start + run
}

/// Display math closes at the next `$$` within the same paragraph.
fn find_display_end(text: &str, from: usize) -> Option<usize> {
    let offset = text[from..].find("$$")?;
    let content = &text[from..from + offset];
    if content.trim().is_empty() || BLANK_LINE.is_match(content) {
        return None;
    }
    Some(from + offset + 2)
}

/// Inline math: a single `$` not adjacent to another `$`, closed on the same
/// line. Content may not start or end with whitespace, which keeps prices
/// like "$5 and $10" as plain text.
fn find_inline_end(bytes: &[u8], open: usize) -> Option<usize> {
    if open > 0 && bytes[open - 1] == b'$' {
        return None;
    }
    let first = *bytes.get(open + 1)?;
    if first.is_ascii_whitespace() {
        return None;
    }
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => return None,
            b'$' => {
                if bytes.get(i + 1) == Some(&b'$') || i == open + 1 {
                    return None;
                }
                if bytes[i - 1].is_ascii_whitespace() {
                    return None;
                }
                return Some(i + 1);
            }
            _ => i += 1,
        }
    }
    None
}

/// Puts the recorded expressions back in place of their tokens.
pub fn restore(html: &str, spans: &[MathSpan]) -> String {
    if spans.is_empty() {
        return html.to_string();
    }
    TOKEN
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let span = caps[1].parse::<usize>().ok().and_then(|index| spans.get(index));
            match span {
                Some(span) if span.display => {
                    format!("<span class=\"math display\">{}</span>", span.source)
                }
                Some(span) => format!("<span class=\"math inline\">{}</span>", span.source),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
