//! Text clean-up before values reach an HTML template

use std::sync::LazyLock;

use regex::Regex;

use super::validate::QuoteInput;

/// Elements whose body is code, dropped with their content. An unclosed one runs to the end.
static CODE_ELEMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?(?:</(?:script|style)\s*>|$)").expect("valid regex")
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Strip markup and template-literal characters from a single value
pub fn sanitize_text(text: &str) -> String {
    let without_code = CODE_ELEMENTS.replace_all(text, "");
    let stripped = TAGS.replace_all(&without_code, "");
    stripped
        .chars()
        .filter(|c| !matches!(c, '`' | '$' | '{' | '}' | '\\' | '<' | '>'))
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn sanitize_quote(input: &QuoteInput) -> QuoteInput {
    QuoteInput {
        core_value: sanitize_text(&input.core_value),
        supporting_value: sanitize_text(&input.supporting_value),
        quote: sanitize_text(&input.quote),
        author: input.author.as_deref().map(sanitize_text).filter(|a| !a.is_empty()),
        style: input.style.clone(),
    }
}

/// Escape for HTML text and attribute contexts
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            _ => out.push(c),
        }
    }
    out
}
