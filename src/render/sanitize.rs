use std::collections::{HashMap, HashSet};

const ALLOWED_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "em", "strong", "del", "ul", "ol", "li",
    "blockquote", "pre", "code", "table", "thead", "tbody", "tr", "th", "td", "hr", "br", "span",
    "a", "dl", "dt", "dd",
];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Restricts HTML to the chat display allow-list: the tags above, `class`
/// everywhere, `href`/`title` on anchors. Script and style bodies are dropped
/// with their tags.
pub fn sanitize_html(html: &str) -> String {
    let mut anchor = HashMap::new();
    anchor.insert("a", HashSet::from(["href", "title"]));

    ammonia::Builder::empty()
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .generic_attributes(HashSet::from(["class"]))
        .tag_attributes(anchor)
        .url_schemes(URL_SCHEMES.iter().copied().collect())
        .clean_content_tags(HashSet::from(["script", "style"]))
        .link_rel(None)
        .clean(html)
        .to_string()
}
